use super::conn;
use crate::CommandError;
use crate::Context;
use crate::HandlerFuture;
use crate::Invocation;
use crate::Registry;
use mkw_core::ChannelId;
use mkw_database::GuildRepository;
use mkw_database::RosterRepository;
use mkw_database::stats;
use mkw_records::Guild;
use mkw_records::MemberStatus;
use mkw_records::Player;
use std::sync::Arc;

/// First-time guild setup: team name, starting roster, results channel.
pub fn setup(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [teamname, players, channel] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: setup <teamname> <p1,p2,...> <channel>".to_string(),
            ));
        };
        let channel = channel
            .trim_start_matches("#")
            .parse::<ChannelId>()
            .map_err(|_| CommandError::Validation("channel must be a channel id".to_string()))?;
        let mut guild = Guild::new(inv.guild, teamname.to_string());
        guild.add_team(teamname.to_string())?;
        guild.set_channel(channel);
        let client = conn(&ctx).await?;
        client.upsert_guild(&guild).await?;
        let mut added = 0;
        for name in players.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let player = Player::new(inv.guild, name.to_string(), MemberStatus::Member);
            if client.create_player(&player).await? {
                added += 1;
            }
        }
        log::info!("guild {} set up with {} players", inv.guild, added);
        Ok(format!(
            "{} is ready: {} players added, results channel set",
            teamname, added
        ))
    })
}

pub fn setchannel(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [channel] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: setchannel <channel>".to_string(),
            ));
        };
        let channel = channel
            .trim_start_matches("#")
            .parse::<ChannelId>()
            .map_err(|_| CommandError::Validation("channel must be a channel id".to_string()))?;
        let client = conn(&ctx).await?;
        match client.set_channel(inv.guild, channel).await? {
            true => Ok("results channel updated".to_string()),
            false => Err(CommandError::Validation("run /setup first".to_string())),
        }
    })
}

/// Leaderboard, or one player's standing when a name is given.
/// Recognizes `lastxwars=N` and `sortby=KEY` anywhere in the argument
/// tail; the rest is the player name.
pub fn stats(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let mut lastx: Option<usize> = None;
        let mut sort = stats::SortKey::default();
        let mut name_parts: Vec<&str> = Vec::new();
        for token in inv.tokens() {
            if let Some(n) = token.strip_prefix("lastxwars=") {
                lastx = Some(n.parse::<usize>().map_err(|_| {
                    CommandError::Validation("lastxwars must be a number".to_string())
                })?);
            } else if let Some(key) = token.strip_prefix("sortby=") {
                sort = key
                    .parse()
                    .map_err(|e: String| CommandError::Validation(e))?;
            } else {
                name_parts.push(token);
            }
        }
        let client = conn(&ctx).await?;
        if name_parts.is_empty() {
            let standings = stats::leaderboard(&**client, inv.guild, sort, 10, lastx).await?;
            if standings.is_empty() {
                return Ok("no wars recorded yet".to_string());
            }
            let mut lines = vec!["Leaderboard:".to_string()];
            for (i, s) in standings.iter().enumerate() {
                lines.push(format!(
                    "  {:>2}. {:<20} avg {:>6.1}  total {:>5}  wars {:>6.2}  diff {:>6}",
                    i + 1,
                    s.name,
                    s.average_score(),
                    s.total_score,
                    s.war_count(),
                    s.total_team_differential
                ));
            }
            Ok(lines.join("\n"))
        } else {
            let name = name_parts.join(" ");
            let found = stats::player_stats(&**client, inv.guild, &name, lastx).await?;
            let Some((s, wars)) = found else {
                return Err(CommandError::Validation(format!(
                    "no wars recorded for {}",
                    name
                )));
            };
            Ok(format!(
                "{}: avg {:.1} over {:.2} wars ({} races, total {}, team diff {}, {} wars on record)",
                s.name,
                s.average_score(),
                s.war_count(),
                s.total_races,
                s.total_score,
                s.total_team_differential,
                wars.len()
            ))
        }
    })
}

pub fn checkpermissions(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let channel = match inv.tokens().as_slice() {
            [] => inv.channel,
            [raw] => raw
                .trim_start_matches("#")
                .parse::<ChannelId>()
                .map_err(|_| {
                    CommandError::Validation("channel must be a channel id".to_string())
                })?,
            _ => {
                return Err(CommandError::Validation(
                    "usage: checkpermissions [channel]".to_string(),
                ));
            }
        };
        let perms = ctx.gateway.permissions(channel).await?;
        let mark = |ok: bool| if ok { "yes" } else { "MISSING" };
        Ok(format!(
            "permissions in {}:\n  read history: {}\n  read attachments: {}\n  send messages: {}",
            channel,
            mark(perms.read_history),
            mark(perms.read_attachments),
            mark(perms.send_messages)
        ))
    })
}

pub fn help(_ctx: Arc<Context>, _inv: Invocation) -> HandlerFuture {
    Box::pin(async move { Ok(Registry::standard().help_text()) })
}
