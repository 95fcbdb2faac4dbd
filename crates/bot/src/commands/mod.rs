//! One handler per slash command, grouped by concern.
//!
//! Handlers return the user-visible reply; validation failures surface
//! as [`CommandError::Validation`] and are shown verbatim.
pub mod misc;
pub mod roster;
pub mod scan;
pub mod teams;
pub mod wars;

use super::CommandError;
use super::Context;
use mkw_core::GuildId;
use mkw_database::Conn;
use mkw_database::RosterRepository;
use mkw_records::Player;

pub(crate) async fn conn(ctx: &Context) -> Result<Conn, CommandError> {
    Ok(ctx.db.get().await?)
}

/// Find a player by canonical name or alias, case-insensitively.
pub(crate) async fn find_player(
    ctx: &Context,
    guild: GuildId,
    name: &str,
) -> Result<Player, CommandError> {
    let client = conn(ctx).await?;
    if let Some(player) = client.get_player(guild, name).await? {
        return Ok(player);
    }
    if let Some(owner) = client.alias_owner(guild, name).await? {
        if let Some(player) = client.get_player(guild, &owner).await? {
            return Ok(player);
        }
    }
    Err(CommandError::Validation(format!(
        "{} is not on the roster",
        name
    )))
}

pub(crate) fn player_line(p: &Player) -> String {
    format!(
        "{:<20} {:<10} {:<8} avg {:>6.1} over {:>5.2} wars",
        p.name(),
        p.team(),
        p.status(),
        p.average_score(),
        p.war_count(),
    )
}

/// Format a roster listing or a placeholder when it is empty.
pub(crate) fn listing(header: &str, players: &[Player]) -> String {
    match players.is_empty() {
        true => format!("{} (none)", header),
        false => {
            let mut lines = vec![header.to_string()];
            lines.extend(players.iter().map(player_line));
            lines.join("\n")
        }
    }
}
