use super::conn;
use super::find_player;
use super::listing;
use crate::CommandError;
use crate::Context;
use crate::HandlerFuture;
use crate::Invocation;
use mkw_database::RosterRepository;
use mkw_records::MemberStatus;
use mkw_records::Player;
use std::sync::Arc;

pub fn addplayer(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name, rest @ ..] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: addplayer <name> [status]".to_string(),
            ));
        };
        let status = match rest {
            [] => MemberStatus::Member,
            [raw] => raw.parse::<MemberStatus>()?,
            _ => {
                return Err(CommandError::Validation(
                    "usage: addplayer <name> [status]".to_string(),
                ));
            }
        };
        let client = conn(&ctx).await?;
        // A taken alias would make the new name unresolvable.
        if let Some(owner) = client.alias_owner(inv.guild, name).await? {
            return Err(CommandError::Validation(format!(
                "{} already resolves to {}",
                name, owner
            )));
        }
        let player = Player::new(inv.guild, name.to_string(), status);
        match client.create_player(&player).await? {
            true => Ok(format!("added {} as {}", player.name(), player.status())),
            false => Err(CommandError::Validation(format!(
                "{} is already on the roster",
                name
            ))),
        }
    })
}

pub fn removeplayer(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: removeplayer <name>".to_string(),
            ));
        };
        let player = find_player(&ctx, inv.guild, name).await?;
        let client = conn(&ctx).await?;
        client.deactivate_player(inv.guild, player.name()).await?;
        Ok(format!(
            "{} removed from the active roster (history retained)",
            player.name()
        ))
    })
}

pub fn setmemberstatus(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name, status] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: setmemberstatus <name> <member|trial|ally|kicked>".to_string(),
            ));
        };
        let status = status.parse::<MemberStatus>()?;
        let player = find_player(&ctx, inv.guild, name).await?;
        let client = conn(&ctx).await?;
        client.set_status(inv.guild, player.name(), status).await?;
        Ok(format!("{} is now {}", player.name(), status))
    })
}

pub fn roster(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let client = conn(&ctx).await?;
        let players = client.list_players(inv.guild, false).await?;
        Ok(listing("Active roster:", &players))
    })
}

pub fn showtrials(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let client = conn(&ctx).await?;
        let players = client.list_by_status(inv.guild, MemberStatus::Trial).await?;
        Ok(listing("Trial members:", &players))
    })
}

pub fn showkicked(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let client = conn(&ctx).await?;
        let players = client.list_by_status(inv.guild, MemberStatus::Kicked).await?;
        Ok(listing("Kicked members:", &players))
    })
}

pub fn addnickname(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name, nickname] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: addnickname <name> <nickname>".to_string(),
            ));
        };
        let mut player = find_player(&ctx, inv.guild, name).await?;
        let client = conn(&ctx).await?;
        // Guild-wide uniqueness keeps resolution deterministic.
        if let Some(owner) = client.alias_owner(inv.guild, nickname).await? {
            if !owner.eq_ignore_ascii_case(player.name()) {
                return Err(CommandError::Validation(format!(
                    "{} already resolves to {}",
                    nickname, owner
                )));
            }
        }
        player.add_nickname(nickname.to_string())?;
        client
            .set_nicknames(inv.guild, player.name(), player.nicknames())
            .await?;
        Ok(format!("{} now answers to {}", player.name(), nickname))
    })
}

pub fn removenickname(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name, nickname] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: removenickname <name> <nickname>".to_string(),
            ));
        };
        let mut player = find_player(&ctx, inv.guild, name).await?;
        if !player.remove_nickname(nickname) {
            return Err(CommandError::Validation(format!(
                "{} has no nickname {}",
                player.name(),
                nickname
            )));
        }
        let client = conn(&ctx).await?;
        client
            .set_nicknames(inv.guild, player.name(), player.nicknames())
            .await?;
        Ok(format!("dropped {} from {}", nickname, player.name()))
    })
}

pub fn nicknamesfor(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let tokens = inv.tokens();
        let [name] = tokens.as_slice() else {
            return Err(CommandError::Validation(
                "usage: nicknamesfor <name>".to_string(),
            ));
        };
        let player = find_player(&ctx, inv.guild, name).await?;
        match player.nicknames() {
            [] => Ok(format!("{} has no nicknames", player.name())),
            nicknames => Ok(format!("{}: {}", player.name(), nicknames.join(", "))),
        }
    })
}
