use super::conn;
use super::find_player;
use super::listing;
use crate::CommandError;
use crate::Context;
use crate::HandlerFuture;
use crate::Invocation;
use mkw_core::GuildId;
use mkw_database::GuildRepository;
use mkw_database::RosterRepository;
use mkw_records::Guild;
use mkw_records::UNASSIGNED;
use std::sync::Arc;

async fn guild_config(ctx: &Context, guild: GuildId) -> Result<Guild, CommandError> {
    let client = conn(ctx).await?;
    client
        .get_guild(guild)
        .await?
        .ok_or_else(|| CommandError::Validation("run /setup first".to_string()))
}

pub fn addteam(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let name = inv.args.trim();
        if name.is_empty() {
            return Err(CommandError::Validation("usage: addteam <name>".to_string()));
        }
        let mut guild = guild_config(&ctx, inv.guild).await?;
        guild.add_team(name.to_string())?;
        let client = conn(&ctx).await?;
        client.set_teams(inv.guild, guild.teams()).await?;
        Ok(format!("team {} created", name))
    })
}

pub fn removeteam(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let name = inv.args.trim();
        if name.is_empty() {
            return Err(CommandError::Validation(
                "usage: removeteam <name>".to_string(),
            ));
        }
        let mut guild = guild_config(&ctx, inv.guild).await?;
        guild.remove_team(name)?;
        let client = conn(&ctx).await?;
        // Members of a deleted team fall back to Unassigned.
        let members = client.list_by_team(inv.guild, name).await?;
        let names = members
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>();
        client.assign_team(inv.guild, &names, UNASSIGNED).await?;
        client.set_teams(inv.guild, guild.teams()).await?;
        Ok(format!(
            "team {} removed; {} players unassigned",
            name,
            names.len()
        ))
    })
}

pub fn renameteam(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [old, new] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: renameteam <old> <new>".to_string(),
            ));
        };
        let mut guild = guild_config(&ctx, inv.guild).await?;
        guild.rename_team(old, new.to_string())?;
        let client = conn(&ctx).await?;
        let members = client.list_by_team(inv.guild, old).await?;
        let names = members
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>();
        client.assign_team(inv.guild, &names, new).await?;
        client.set_teams(inv.guild, guild.teams()).await?;
        Ok(format!("team {} renamed to {}", old, new))
    })
}

pub fn assignplayers(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        // Grammar: comma list of players, then the team name (which may
        // contain spaces).
        let Some((players, team)) = inv.args.trim().split_once(' ') else {
            return Err(CommandError::Validation(
                "usage: assignplayers <p1,p2,...> <team>".to_string(),
            ));
        };
        let team = team.trim();
        let guild = guild_config(&ctx, inv.guild).await?;
        if !guild.has_team(team) {
            return Err(CommandError::Validation(format!("no team named {}", team)));
        }
        let mut names = Vec::new();
        for raw in players.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            names.push(find_player(&ctx, inv.guild, raw).await?.name().to_string());
        }
        if names.is_empty() {
            return Err(CommandError::Validation(
                "no players to assign".to_string(),
            ));
        }
        let client = conn(&ctx).await?;
        let moved = client.assign_team(inv.guild, &names, team).await?;
        Ok(format!("assigned {} players to {}", moved, team))
    })
}

pub fn unassignplayer(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: unassignplayerfromteam <name>".to_string(),
            ));
        };
        let player = find_player(&ctx, inv.guild, name).await?;
        let client = conn(&ctx).await?;
        client
            .assign_team(inv.guild, &[player.name().to_string()], UNASSIGNED)
            .await?;
        Ok(format!("{} moved to {}", player.name(), UNASSIGNED))
    })
}

pub fn showallteams(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let guild = guild_config(&ctx, inv.guild).await?;
        let client = conn(&ctx).await?;
        let mut lines = vec!["Teams:".to_string()];
        for team in guild.teams() {
            let members = client.list_by_team(inv.guild, team).await?;
            lines.push(format!("  {} ({} players)", team, members.len()));
        }
        let unassigned = client.list_by_team(inv.guild, UNASSIGNED).await?;
        lines.push(format!("  {} ({} players)", UNASSIGNED, unassigned.len()));
        Ok(lines.join("\n"))
    })
}

pub fn showteamroster(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let team = inv.args.trim();
        if team.is_empty() {
            return Err(CommandError::Validation(
                "usage: showspecificteamroster <team>".to_string(),
            ));
        }
        let guild = guild_config(&ctx, inv.guild).await?;
        if !guild.has_team(team) {
            return Err(CommandError::Validation(format!("no team named {}", team)));
        }
        let client = conn(&ctx).await?;
        let players = client.list_by_team(inv.guild, team).await?;
        Ok(listing(&format!("{} roster:", team), &players))
    })
}
