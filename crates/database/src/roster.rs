use super::*;
use mkw_core::ChannelId;
use mkw_core::GuildId;
use mkw_records::Guild;
use mkw_records::MemberStatus;
use mkw_records::Player;
use std::str::FromStr;
use std::time::SystemTime;
use tokio_postgres::GenericClient;
use tokio_postgres::Row;

fn guild_from(row: &Row) -> Guild {
    Guild::restore(
        row.get(0),
        row.get(1),
        row.get(2),
        row.get(3),
        row.get(4),
    )
}

fn player_from(row: &Row) -> Player {
    Player::restore(
        row.get(0),
        row.get(1),
        row.get(2),
        row.get(3),
        MemberStatus::from_str(row.get(4)).unwrap_or(MemberStatus::Member),
        row.get(5),
        row.get(6),
        row.get(7),
        row.get(8),
        row.get::<_, Option<SystemTime>>(9),
    )
}

const PLAYER_COLUMNS: &str = "guild_id, player_name, nicknames, team_name, member_status, \
     is_active, total_score, total_races, war_count, last_war_date";

/// Tenant configuration reads and writes.
#[allow(async_fn_in_trait)]
pub trait GuildRepository {
    async fn upsert_guild(&self, guild: &Guild) -> Result<(), PgErr>;
    async fn get_guild(&self, guild: GuildId) -> Result<Option<Guild>, PgErr>;
    async fn get_guilds(&self, guilds: &[GuildId]) -> Result<Vec<Guild>, PgErr>;
    async fn set_channel(&self, guild: GuildId, channel: ChannelId) -> Result<bool, PgErr>;
    async fn set_teams(&self, guild: GuildId, teams: &[String]) -> Result<bool, PgErr>;
}

impl<C: GenericClient> GuildRepository for C {
    async fn upsert_guild(&self, guild: &Guild) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                GUILDS,
                " (guild_id, guild_name, ocr_channel_id, team_names, is_active)
                 VALUES ($1, $2, $3, $4, TRUE)
                 ON CONFLICT (guild_id) DO UPDATE SET
                   guild_name = EXCLUDED.guild_name,
                   ocr_channel_id = COALESCE(EXCLUDED.ocr_channel_id, ",
                GUILDS,
                ".ocr_channel_id),
                   team_names = EXCLUDED.team_names,
                   is_active = TRUE"
            ),
            &[
                &guild.guild_id(),
                &guild.name(),
                &guild.ocr_channel(),
                &guild.teams(),
            ],
        )
        .await
        .map(|_| ())
    }
    async fn get_guild(&self, guild: GuildId) -> Result<Option<Guild>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT guild_id, guild_name, ocr_channel_id, team_names, is_active FROM ",
                GUILDS,
                " WHERE guild_id = $1"
            ),
            &[&guild],
        )
        .await
        .map(|opt| opt.map(|row| guild_from(&row)))
    }
    async fn get_guilds(&self, guilds: &[GuildId]) -> Result<Vec<Guild>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT guild_id, guild_name, ocr_channel_id, team_names, is_active FROM ",
                GUILDS,
                " WHERE guild_id = ANY($1) AND is_active ORDER BY guild_id"
            ),
            &[&guilds],
        )
        .await
        .map(|rows| rows.iter().map(guild_from).collect())
    }
    async fn set_channel(&self, guild: GuildId, channel: ChannelId) -> Result<bool, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                GUILDS,
                " SET ocr_channel_id = $2 WHERE guild_id = $1"
            ),
            &[&guild, &channel],
        )
        .await
        .map(|n| n > 0)
    }
    async fn set_teams(&self, guild: GuildId, teams: &[String]) -> Result<bool, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                GUILDS,
                " SET team_names = $2 WHERE guild_id = $1"
            ),
            &[&guild, &teams],
        )
        .await
        .map(|n| n > 0)
    }
}

/// Roster reads and writes, all guild-scoped.
#[allow(async_fn_in_trait)]
pub trait RosterRepository {
    /// Insert a new player; false when the canonical name is taken.
    async fn create_player(&self, player: &Player) -> Result<bool, PgErr>;
    async fn get_player(&self, guild: GuildId, name: &str) -> Result<Option<Player>, PgErr>;
    async fn list_players(&self, guild: GuildId, include_inactive: bool) -> Result<Vec<Player>, PgErr>;
    /// Every roster row, active or not, for resolution snapshots.
    async fn roster(&self, guild: GuildId) -> Result<Vec<Player>, PgErr>;
    async fn list_by_status(&self, guild: GuildId, status: MemberStatus) -> Result<Vec<Player>, PgErr>;
    async fn list_by_team(&self, guild: GuildId, team: &str) -> Result<Vec<Player>, PgErr>;
    async fn set_status(&self, guild: GuildId, name: &str, status: MemberStatus) -> Result<bool, PgErr>;
    async fn deactivate_player(&self, guild: GuildId, name: &str) -> Result<bool, PgErr>;
    async fn set_nicknames(&self, guild: GuildId, name: &str, nicknames: &[String]) -> Result<bool, PgErr>;
    /// Canonical owner of `alias` (nickname or name), case-insensitive.
    async fn alias_owner(&self, guild: GuildId, alias: &str) -> Result<Option<String>, PgErr>;
    async fn assign_team(&self, guild: GuildId, names: &[String], team: &str) -> Result<u64, PgErr>;
    /// Write back the derived aggregates. Call inside the same
    /// transaction as the war mutation that changed them.
    async fn store_aggregates(&self, player: &Player) -> Result<(), PgErr>;
    /// Lock and load the named players for aggregate updates.
    async fn lock_players(&self, guild: GuildId, names: &[String]) -> Result<Vec<Player>, PgErr>;
}

impl<C: GenericClient> RosterRepository for C {
    async fn create_player(&self, player: &Player) -> Result<bool, PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                PLAYERS,
                " (guild_id, player_name, nicknames, team_name, member_status, is_active)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (guild_id, player_name) DO NOTHING"
            ),
            &[
                &player.guild_id(),
                &player.name(),
                &player.nicknames(),
                &player.team(),
                &player.status().as_str(),
                &player.active(),
            ],
        )
        .await
        .map(|n| n > 0)
    }
    async fn get_player(&self, guild: GuildId, name: &str) -> Result<Option<Player>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                PLAYER_COLUMNS,
                " FROM ",
                PLAYERS,
                " WHERE guild_id = $1 AND player_name = $2"
            ),
            &[&guild, &name],
        )
        .await
        .map(|opt| opt.map(|row| player_from(&row)))
    }
    async fn list_players(
        &self,
        guild: GuildId,
        include_inactive: bool,
    ) -> Result<Vec<Player>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT ",
                PLAYER_COLUMNS,
                " FROM ",
                PLAYERS,
                " WHERE guild_id = $1 AND (is_active OR $2) ORDER BY player_name"
            ),
            &[&guild, &include_inactive],
        )
        .await
        .map(|rows| rows.iter().map(player_from).collect())
    }
    async fn roster(&self, guild: GuildId) -> Result<Vec<Player>, PgErr> {
        self.list_players(guild, true).await
    }
    async fn list_by_status(
        &self,
        guild: GuildId,
        status: MemberStatus,
    ) -> Result<Vec<Player>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT ",
                PLAYER_COLUMNS,
                " FROM ",
                PLAYERS,
                " WHERE guild_id = $1 AND member_status = $2 ORDER BY player_name"
            ),
            &[&guild, &status.as_str()],
        )
        .await
        .map(|rows| rows.iter().map(player_from).collect())
    }
    async fn list_by_team(&self, guild: GuildId, team: &str) -> Result<Vec<Player>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT ",
                PLAYER_COLUMNS,
                " FROM ",
                PLAYERS,
                " WHERE guild_id = $1 AND LOWER(team_name) = LOWER($2) AND is_active
                 ORDER BY player_name"
            ),
            &[&guild, &team],
        )
        .await
        .map(|rows| rows.iter().map(player_from).collect())
    }
    async fn set_status(
        &self,
        guild: GuildId,
        name: &str,
        status: MemberStatus,
    ) -> Result<bool, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PLAYERS,
                " SET member_status = $3,
                      is_active = is_active AND $3 <> 'kicked'
                 WHERE guild_id = $1 AND player_name = $2"
            ),
            &[&guild, &name, &status.as_str()],
        )
        .await
        .map(|n| n > 0)
    }
    async fn deactivate_player(&self, guild: GuildId, name: &str) -> Result<bool, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PLAYERS,
                " SET is_active = FALSE WHERE guild_id = $1 AND player_name = $2"
            ),
            &[&guild, &name],
        )
        .await
        .map(|n| n > 0)
    }
    async fn set_nicknames(
        &self,
        guild: GuildId,
        name: &str,
        nicknames: &[String],
    ) -> Result<bool, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PLAYERS,
                " SET nicknames = $3 WHERE guild_id = $1 AND player_name = $2"
            ),
            &[&guild, &name, &nicknames],
        )
        .await
        .map(|n| n > 0)
    }
    async fn alias_owner(&self, guild: GuildId, alias: &str) -> Result<Option<String>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT player_name FROM ",
                PLAYERS,
                " WHERE guild_id = $1 AND (
                    LOWER(player_name) = LOWER($2)
                    OR EXISTS (
                        SELECT 1 FROM unnest(nicknames) AS n WHERE LOWER(n) = LOWER($2)
                    )
                 )
                 LIMIT 1"
            ),
            &[&guild, &alias],
        )
        .await
        .map(|opt| opt.map(|row| row.get(0)))
    }
    async fn assign_team(
        &self,
        guild: GuildId,
        names: &[String],
        team: &str,
    ) -> Result<u64, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PLAYERS,
                " SET team_name = $3 WHERE guild_id = $1 AND player_name = ANY($2)"
            ),
            &[&guild, &names, &team],
        )
        .await
    }
    async fn store_aggregates(&self, player: &Player) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PLAYERS,
                " SET total_score = $3,
                      total_races = $4,
                      war_count = $5,
                      average_score = $6,
                      last_war_date = $7
                 WHERE guild_id = $1 AND player_name = $2"
            ),
            &[
                &player.guild_id(),
                &player.name(),
                &player.total_score(),
                &player.total_races(),
                &player.war_count(),
                &player.average_score(),
                &player.last_war(),
            ],
        )
        .await
        .map(|_| ())
    }
    async fn lock_players(&self, guild: GuildId, names: &[String]) -> Result<Vec<Player>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT ",
                PLAYER_COLUMNS,
                " FROM ",
                PLAYERS,
                " WHERE guild_id = $1 AND player_name = ANY($2)
                 ORDER BY player_name
                 FOR UPDATE"
            ),
            &[&guild, &names],
        )
        .await
        .map(|rows| rows.iter().map(player_from).collect())
    }
}
