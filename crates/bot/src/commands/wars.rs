use super::conn;
use crate::CommandError;
use crate::Context;
use crate::HandlerFuture;
use crate::Invocation;
use crate::parse::parse_scores;
use crate::scan::record_war;
use mkw_core::DEFAULT_RACE_COUNT;
use mkw_core::Races;
use mkw_core::WarId;
use mkw_database::war;
use mkw_records::War;
use mkw_records::WarPlayer;
use std::sync::Arc;
use std::time::SystemTime;

/// Split an `addwar` argument tail into the score list and an optional
/// trailing race count.
fn split_races(args: &str) -> (&str, Option<Races>) {
    match args.trim().rsplit_once(' ') {
        Some((head, tail)) if head.contains(':') => match tail.trim().parse::<Races>() {
            Ok(races) => (head, Some(races)),
            Err(_) => (args, None),
        },
        _ => (args, None),
    }
}

pub fn addwar(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let (scores, races) = split_races(&inv.args);
        let entries = parse_scores(scores)?;
        let race_count = races.unwrap_or(DEFAULT_RACE_COUNT);
        let roster = ctx.roster(inv.guild).await?;
        let mut lines = Vec::with_capacity(entries.len());
        let mut unknown = Vec::new();
        for (name, score) in entries {
            let resolved = mkw_resolver::resolve(&roster, &name);
            if !resolved.is_roster_member {
                unknown.push(name.clone());
            }
            lines.push(WarPlayer::new(resolved.name, score, race_count));
        }
        if !unknown.is_empty() {
            return Err(CommandError::Validation(format!(
                "not on the roster: {} (addplayer or addnickname first)",
                unknown.join(", ")
            )));
        }
        let war = War::new(0, inv.guild, race_count, SystemTime::now(), lines)?;
        let war_id = record_war(&ctx, &war, false).await?;
        Ok(format!(
            "war {} recorded: {} races, team score {}, differential {} ({})",
            war_id,
            war.race_count(),
            war.team_score(),
            war.differential(),
            war.outcome()
        ))
    })
}

pub fn appendplayertowar(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let Some((id, scores)) = inv.args.trim().split_once(' ') else {
            return Err(CommandError::Validation(
                "usage: appendplayertowar <war_id> <Name:Score,...>".to_string(),
            ));
        };
        let war_id = id
            .parse::<WarId>()
            .map_err(|_| CommandError::Validation("war id must be a number".to_string()))?;
        let entries = parse_scores(scores)?;
        let roster = ctx.roster(inv.guild).await?;
        let mut client = conn(&ctx).await?;
        let txn = client
            .build_transaction()
            .isolation_level(mkw_database::IsolationLevel::RepeatableRead)
            .start()
            .await?;
        let race_count = war::get_war(&*txn, inv.guild, war_id)
            .await?
            .ok_or_else(|| CommandError::Validation(format!("no war with id {}", war_id)))?
            .race_count();
        for (name, score) in entries.iter() {
            let resolved = mkw_resolver::resolve(&roster, name);
            if !resolved.is_roster_member {
                return Err(CommandError::Validation(format!(
                    "{} is not on the roster",
                    name
                )));
            }
            war::append_player(
                &txn,
                inv.guild,
                war_id,
                WarPlayer::new(resolved.name, *score, race_count),
            )
            .await?;
        }
        txn.commit().await?;
        Ok(format!(
            "added {} players to war {}",
            entries.len(),
            war_id
        ))
    })
}

pub fn removewar(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [id] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: removewar <war_id>".to_string(),
            ));
        };
        let war_id = id
            .parse::<WarId>()
            .map_err(|_| CommandError::Validation("war id must be a number".to_string()))?;
        let mut client = conn(&ctx).await?;
        let txn = client
            .build_transaction()
            .isolation_level(mkw_database::IsolationLevel::RepeatableRead)
            .start()
            .await?;
        let removed = war::remove_war(&txn, inv.guild, war_id).await?;
        txn.commit().await?;
        Ok(format!(
            "war {} removed; reverted {} players' aggregates",
            war_id,
            removed.players().len()
        ))
    })
}

pub fn showallwars(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let limit = match inv.tokens().as_slice() {
            [] => 10,
            [raw] => raw
                .parse::<i64>()
                .ok()
                .filter(|n| (1..=50).contains(n))
                .ok_or_else(|| {
                    CommandError::Validation("limit must be between 1 and 50".to_string())
                })?,
            _ => {
                return Err(CommandError::Validation(
                    "usage: showallwars [limit]".to_string(),
                ));
            }
        };
        let client = conn(&ctx).await?;
        let (wars, total) = war::list_wars(&**client, inv.guild, 1, limit).await?;
        if wars.is_empty() {
            return Ok("no wars recorded yet".to_string());
        }
        let mut lines = vec![format!("Most recent {} of {} wars:", wars.len(), total)];
        for w in wars.iter() {
            lines.push(format!(
                "  #{} — {} players, {} races, score {}, diff {} ({})",
                w.id(),
                w.players().len(),
                w.race_count(),
                w.team_score(),
                w.differential(),
                w.outcome()
            ));
        }
        Ok(lines.join("\n"))
    })
}
