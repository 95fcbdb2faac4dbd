//! Scan pipelines: interactive single-image flow and bulk sessions.
use super::Batcher;
use super::CommandError;
use super::Context;
use super::ImageRef;
use super::PendingScan;
use mkw_bulk::BatchItem;
use mkw_bulk::NewFailure;
use mkw_bulk::NewResult;
use mkw_core::BULK_SCAN_LIMIT;
use mkw_core::ChannelId;
use mkw_core::DEFAULT_RACE_COUNT;
use mkw_core::GuildId;
use mkw_core::MessageId;
use mkw_core::Races;
use mkw_core::RETRY_ATTEMPTS;
use mkw_core::RETRY_BACKOFF;
use mkw_core::UserId;
use mkw_core::WarId;
use mkw_database::RosterRepository;
use mkw_database::war;
use mkw_ocr::OcrStatus;
use mkw_ocr::Tier;
use mkw_ocr::parse::ScoreLine;
use mkw_ocr::parse::score_lines;
use mkw_records::DetectedPlayer;
use mkw_records::MemberStatus;
use mkw_records::Player;
use mkw_records::War;
use mkw_records::WarPlayer;
use mkw_resolver::Roster;
use std::sync::Arc;
use std::time::SystemTime;

const UNREADABLE: &str = "couldn't read this image, try again or enter manually";

/// Resolve raw score lines against the roster.
fn detect(roster: &Roster, lines: &[ScoreLine], race_count: Races) -> Vec<DetectedPlayer> {
    lines
        .iter()
        .map(|line| {
            let resolved = mkw_resolver::resolve(roster, &line.raw_name);
            DetectedPlayer {
                name: resolved.name,
                score: line.score,
                raw_name: line.raw_name.clone(),
                is_roster_member: resolved.is_roster_member,
                races_played: race_count,
            }
        })
        .collect()
}

/// Run one image at EXPRESS priority and stage an interactive
/// confirmation. Returns the confirmation prompt.
pub async fn single_scan(
    ctx: &Context,
    guild: GuildId,
    channel: ChannelId,
    _user: UserId,
    image: ImageRef,
) -> Result<String, CommandError> {
    let bytes = ctx.gateway.download(&image.url).await?;
    let output = ctx.engine.submit(Tier::Express, bytes).await;
    if let OcrStatus::Error(message) = &output.status {
        log::warn!("express scan failed: {}", message);
        return Err(CommandError::Validation(UNREADABLE.to_string()));
    }
    let lines = score_lines(&output.boxes);
    if lines.is_empty() {
        return Err(CommandError::Validation(UNREADABLE.to_string()));
    }
    let roster = ctx.roster(guild).await?;
    let detected = detect(&roster, &lines, DEFAULT_RACE_COUNT);
    let occurred_at = image.timestamp.unwrap_or_else(SystemTime::now);
    let mut prompt = vec![format!("Detected {} players:", detected.len())];
    for p in detected.iter() {
        let marker = match p.is_roster_member {
            true => "",
            false => " (new)",
        };
        prompt.push(format!("  {} — {}{}", p.name, p.score, marker));
    }
    prompt.push("React to approve or reject this war.".to_string());
    ctx.pending.lock().expect("pending lock").insert(
        image.message_id,
        PendingScan {
            guild,
            channel,
            detected,
            race_count: DEFAULT_RACE_COUNT,
            occurred_at,
        },
    );
    Ok(prompt.join("\n"))
}

/// Finish an interactive confirmation: insert the war on approval.
pub async fn approve(
    ctx: &Context,
    guild: GuildId,
    key: MessageId,
    approved: bool,
) -> Result<String, CommandError> {
    let Some(pending) = ctx.pending.lock().expect("pending lock").remove(&key) else {
        return Err(CommandError::Validation(
            "nothing pending for that message".to_string(),
        ));
    };
    if pending.guild != guild {
        return Err(CommandError::Validation(
            "that confirmation belongs to another guild".to_string(),
        ));
    }
    if !approved {
        return Ok("scan discarded".to_string());
    }
    let lines = pending
        .detected
        .iter()
        .map(|p| WarPlayer::new(p.name.clone(), p.score, p.races_played))
        .collect::<Vec<_>>();
    let war = War::new(0, guild, pending.race_count, pending.occurred_at, lines)?;
    let war_id = record_war(ctx, &war, true).await?;
    Ok(format!(
        "war {} recorded: {} players, team score {}, differential {}",
        war_id,
        war.players().len(),
        war.team_score(),
        war.differential()
    ))
}

/// Insert one war in one transaction, retrying transient conflicts.
/// With `auto_create`, unknown names join the roster first (interactive
/// confirmation is review; bulk confirm has the same safety net).
pub async fn record_war(ctx: &Context, war: &War, auto_create: bool) -> Result<WarId, CommandError> {
    let mut delay = RETRY_BACKOFF;
    for attempt in 1.. {
        match try_record(ctx, war, auto_create).await {
            Err(CommandError::Storage(message)) if attempt < RETRY_ATTEMPTS => {
                log::warn!("war insert retry {}: {}", attempt, message);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            other => return other,
        }
    }
    unreachable!("retry loop always returns")
}

async fn try_record(ctx: &Context, war: &War, auto_create: bool) -> Result<WarId, CommandError> {
    let mut client = ctx.db.get().await?;
    let txn = client
        .build_transaction()
        .isolation_level(mkw_database::IsolationLevel::RepeatableRead)
        .start()
        .await?;
    if auto_create {
        for line in war.players() {
            if txn.get_player(war.guild_id(), &line.name).await?.is_none() {
                let recruit = Player::new(war.guild_id(), line.name.clone(), MemberStatus::Member);
                txn.create_player(&recruit).await?;
                log::info!("auto-created roster entry {}", line.name);
            }
        }
    }
    let war_id = war::persist_war(&txn, war).await?;
    txn.commit().await?;
    Ok(war_id)
}

/// Bulk scan: collect recent channel images, open a review session, fan
/// the images out at bulk priority, and report the review URL.
pub async fn bulk_scan(
    ctx: Arc<Context>,
    guild: GuildId,
    channel: ChannelId,
    user: UserId,
) -> Result<String, CommandError> {
    let images = ctx.gateway.recent_images(channel, BULK_SCAN_LIMIT).await?;
    if images.is_empty() {
        return Err(CommandError::Validation(
            "no recent images found in this channel".to_string(),
        ));
    }
    let token = ctx.api.create_session(guild, user, images.len()).await?;
    let tier = ctx.engine.config().bulk_tier(images.len());
    log::info!(
        "bulk scan of {} images for guild {} at {} priority",
        images.len(),
        guild,
        tier
    );
    let roster = ctx.roster(guild).await?;
    let batcher = Batcher::spawn(ctx.store.clone(), token.clone());
    let jobs = images
        .into_iter()
        .map(|image| {
            let ctx = ctx.clone();
            let roster = roster.clone();
            let batcher = &batcher;
            async move {
                let item = scan_bulk_image(&ctx, tier, &roster, image).await;
                batcher.push(item);
            }
        })
        .collect::<Vec<_>>();
    futures::future::join_all(jobs).await;
    batcher.finish().await;
    Ok(format!(
        "bulk scan complete — review at {}/review/{}",
        ctx.public_web_url.trim_end_matches('/'),
        token
    ))
}

async fn scan_bulk_image(ctx: &Context, tier: Tier, roster: &Roster, image: ImageRef) -> BatchItem {
    let failure = |message: String| {
        BatchItem::Failure(NewFailure {
            image_filename: image.filename.clone(),
            image_url: Some(image.url.clone()),
            error_message: message,
            message_timestamp: image.timestamp,
            message_id: Some(image.message_id),
        })
    };
    let bytes = match ctx.gateway.download(&image.url).await {
        Ok(bytes) => bytes,
        Err(e) => return failure(format!("download failed: {}", e)),
    };
    let output = ctx.engine.submit(tier, bytes).await;
    match output.status {
        OcrStatus::Error(message) => failure(message),
        OcrStatus::Empty => failure("no text detected".to_string()),
        OcrStatus::Ok => {
            let lines = score_lines(&output.boxes);
            if lines.is_empty() {
                return failure("no score rows recognized".to_string());
            }
            BatchItem::Result(NewResult {
                image_filename: image.filename.clone(),
                image_url: Some(image.url.clone()),
                detected_players: detect(roster, &lines, DEFAULT_RACE_COUNT),
                race_count: DEFAULT_RACE_COUNT,
                message_timestamp: image.timestamp,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkw_ocr::TextBox;

    #[test]
    fn detection_resolves_against_roster() {
        let players = vec![
            {
                let mut p = Player::new(1, "Willow".to_string(), MemberStatus::Member);
                p.add_nickname("Wisp".to_string()).unwrap();
                p
            },
            Player::new(1, "Alpha".to_string(), MemberStatus::Member),
        ];
        let roster = Roster::snapshot(&players);
        let boxes = vec![
            TextBox::new("Wi11ow 85".to_string(), (0, 0, 80, 16), 90.0),
            TextBox::new("Alpha 95".to_string(), (0, 24, 80, 16), 90.0),
            TextBox::new("Stranger 70".to_string(), (0, 48, 80, 16), 90.0),
        ];
        let detected = detect(&roster, &score_lines(&boxes), 12);
        assert_eq!(detected.len(), 3);
        assert_eq!(detected[0].name, "Willow");
        assert_eq!(detected[0].raw_name, "Wi11ow");
        assert!(detected[0].is_roster_member);
        assert!(detected[1].is_roster_member);
        assert_eq!(detected[2].name, "Stranger");
        assert!(!detected[2].is_roster_member);
        assert!(detected.iter().all(|p| p.races_played == 12));
    }
}
