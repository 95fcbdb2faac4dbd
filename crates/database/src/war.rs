//! Transactional war persistence.
//!
//! A war mutation is one unit: the war row, its player lines, and the
//! aggregate updates for every touched roster row commit or roll back
//! together. Player rows are locked with `FOR UPDATE` so concurrent
//! inserts over the same roster serialize instead of clobbering.
use super::*;
use mkw_core::GuildId;
use mkw_core::WarId;
use mkw_records::RecordError;
use mkw_records::War;
use mkw_records::WarPlayer;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio_postgres::GenericClient;
use tokio_postgres::Transaction;

/// Failures from the war persistence path.
#[derive(Debug)]
pub enum WarStoreError {
    UnknownPlayer(String),
    NotFound(WarId),
    Invalid(RecordError),
    Storage(PgErr),
}

impl std::fmt::Display for WarStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPlayer(name) => write!(f, "{} is not on the roster", name),
            Self::NotFound(id) => write!(f, "no war with id {}", id),
            Self::Invalid(e) => write!(f, "{}", e),
            Self::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for WarStoreError {}

impl From<PgErr> for WarStoreError {
    fn from(e: PgErr) -> Self {
        Self::Storage(e)
    }
}
impl From<RecordError> for WarStoreError {
    fn from(e: RecordError) -> Self {
        Self::Invalid(e)
    }
}

/// Insert a validated war and credit every named player's aggregates.
///
/// Every name must already exist on the roster; callers that allow
/// auto-creation (bulk confirm) create the rows first in the same
/// transaction. Returns the new war id.
pub async fn persist_war(txn: &Transaction<'_>, war: &War) -> Result<WarId, WarStoreError> {
    let names = war
        .players()
        .iter()
        .map(|p| p.name.clone())
        .collect::<Vec<_>>();
    let mut locked = txn.lock_players(war.guild_id(), &names).await?;
    for name in names.iter() {
        if !locked.iter().any(|p| p.name() == name) {
            return Err(WarStoreError::UnknownPlayer(name.clone()));
        }
    }
    let war_id: WarId = txn
        .query_one(
            const_format::concatcp!(
                "INSERT INTO ",
                WARS,
                " (guild_id, race_count, occurred_at) VALUES ($1, $2, $3) RETURNING war_id"
            ),
            &[&war.guild_id(), &war.race_count(), &war.occurred_at()],
        )
        .await?
        .get(0);
    for line in war.players() {
        txn.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                WAR_PLAYERS,
                " (war_id, guild_id, player_name, score, races_played) VALUES ($1, $2, $3, $4, $5)"
            ),
            &[
                &war_id,
                &war.guild_id(),
                &line.name,
                &line.score,
                &line.races_played,
            ],
        )
        .await?;
        let player = locked
            .iter_mut()
            .find(|p| p.name() == line.name)
            .expect("locked set covers every line");
        player.credit(line.score, line.races_played, war.race_count(), war.occurred_at());
        txn.store_aggregates(player).await?;
    }
    log::info!(
        "recorded war {} ({} players, differential {})",
        war_id,
        war.players().len(),
        war.differential()
    );
    Ok(war_id)
}

/// Remove a war, reversing its statistical contribution first.
///
/// Returns the removed war so callers can render what was undone.
pub async fn remove_war(
    txn: &Transaction<'_>,
    guild: GuildId,
    war_id: WarId,
) -> Result<War, WarStoreError> {
    let war = get_war(txn, guild, war_id)
        .await?
        .ok_or(WarStoreError::NotFound(war_id))?;
    let names = war
        .players()
        .iter()
        .map(|p| p.name.clone())
        .collect::<Vec<_>>();
    let mut locked = txn.lock_players(guild, &names).await?;
    for line in war.players() {
        let Some(player) = locked.iter_mut().find(|p| p.name() == line.name) else {
            continue;
        };
        player.debit(line.score, line.races_played, war.race_count());
        let last: Option<SystemTime> = txn
            .query_one(
                const_format::concatcp!(
                    "SELECT MAX(w.occurred_at) FROM ",
                    WARS,
                    " w JOIN ",
                    WAR_PLAYERS,
                    " wp ON wp.war_id = w.war_id
                     WHERE w.guild_id = $1 AND wp.player_name = $2 AND w.war_id <> $3"
                ),
                &[&guild, &line.name, &war_id],
            )
            .await?
            .get(0);
        player.set_last_war(last);
        txn.store_aggregates(player).await?;
    }
    txn.execute(
        const_format::concatcp!("DELETE FROM ", WARS, " WHERE guild_id = $1 AND war_id = $2"),
        &[&guild, &war_id],
    )
    .await?;
    log::info!("removed war {} and reverted {} aggregates", war_id, names.len());
    Ok(war)
}

/// Add one player line to an existing war, crediting their aggregates.
pub async fn append_player(
    txn: &Transaction<'_>,
    guild: GuildId,
    war_id: WarId,
    line: WarPlayer,
) -> Result<(), WarStoreError> {
    let mut war = get_war(txn, guild, war_id)
        .await?
        .ok_or(WarStoreError::NotFound(war_id))?;
    war.push_player(line.clone())?;
    let mut locked = txn.lock_players(guild, std::slice::from_ref(&line.name)).await?;
    let player = locked
        .first_mut()
        .ok_or_else(|| WarStoreError::UnknownPlayer(line.name.clone()))?;
    txn.execute(
        const_format::concatcp!(
            "INSERT INTO ",
            WAR_PLAYERS,
            " (war_id, guild_id, player_name, score, races_played) VALUES ($1, $2, $3, $4, $5)"
        ),
        &[&war_id, &guild, &line.name, &line.score, &line.races_played],
    )
    .await?;
    player.credit(line.score, line.races_played, war.race_count(), war.occurred_at());
    txn.store_aggregates(player).await?;
    Ok(())
}

/// Load one war with its player lines.
pub async fn get_war<C: GenericClient>(
    client: &C,
    guild: GuildId,
    war_id: WarId,
) -> Result<Option<War>, WarStoreError> {
    let Some(row) = client
        .query_opt(
            const_format::concatcp!(
                "SELECT war_id, guild_id, race_count, occurred_at FROM ",
                WARS,
                " WHERE guild_id = $1 AND war_id = $2"
            ),
            &[&guild, &war_id],
        )
        .await?
    else {
        return Ok(None);
    };
    let lines = client
        .query(
            const_format::concatcp!(
                "SELECT player_name, score, races_played FROM ",
                WAR_PLAYERS,
                " WHERE war_id = $1 ORDER BY score DESC, player_name"
            ),
            &[&war_id],
        )
        .await?
        .iter()
        .map(|r| WarPlayer::new(r.get(0), r.get(1), r.get(2)))
        .collect::<Vec<_>>();
    War::new(
        row.get(0),
        row.get(1),
        row.get(2),
        row.get(3),
        lines,
    )
    .map(Some)
    .map_err(WarStoreError::Invalid)
}

/// One page of a guild's wars, newest first, with the total row count.
pub async fn list_wars<C: GenericClient>(
    client: &C,
    guild: GuildId,
    page: i64,
    limit: i64,
) -> Result<(Vec<War>, i64), WarStoreError> {
    let offset = (page.max(1) - 1) * limit;
    let total: i64 = client
        .query_one(
            const_format::concatcp!("SELECT COUNT(*) FROM ", WARS, " WHERE guild_id = $1"),
            &[&guild],
        )
        .await?
        .get(0);
    let heads = client
        .query(
            const_format::concatcp!(
                "SELECT war_id, guild_id, race_count, occurred_at FROM ",
                WARS,
                " WHERE guild_id = $1 ORDER BY occurred_at DESC, war_id DESC LIMIT $2 OFFSET $3"
            ),
            &[&guild, &limit, &offset],
        )
        .await?;
    let ids = heads
        .iter()
        .map(|r| r.get::<_, WarId>(0))
        .collect::<Vec<_>>();
    let mut lines: HashMap<WarId, Vec<WarPlayer>> = HashMap::new();
    for r in client
        .query(
            const_format::concatcp!(
                "SELECT war_id, player_name, score, races_played FROM ",
                WAR_PLAYERS,
                " WHERE war_id = ANY($1) ORDER BY score DESC, player_name"
            ),
            &[&ids],
        )
        .await?
    {
        lines
            .entry(r.get(0))
            .or_default()
            .push(WarPlayer::new(r.get(1), r.get(2), r.get(3)));
    }
    let wars = heads
        .iter()
        .map(|r| {
            War::new(
                r.get(0),
                r.get(1),
                r.get(2),
                r.get(3),
                lines.remove(&r.get::<_, WarId>(0)).unwrap_or_default(),
            )
            .map_err(WarStoreError::Invalid)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((wars, total))
}

/// Every war in a guild, newest first. Stats recomputations (lastxwars,
/// overview, per-player differentials) fold over this in memory.
pub async fn all_wars<C: GenericClient>(
    client: &C,
    guild: GuildId,
) -> Result<Vec<War>, WarStoreError> {
    let (wars, _) = list_wars(client, guild, 1, i64::MAX).await?;
    Ok(wars)
}
