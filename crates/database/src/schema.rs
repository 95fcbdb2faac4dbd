//! DDL generation for the persistent schema.
//!
//! Implements [`Schema`] on the record types; every statement is
//! idempotent (`IF NOT EXISTS`) so [`migrate`] can run at every startup.
use super::*;
use mkw_records::BulkFailure;
use mkw_records::BulkResult;
use mkw_records::BulkSession;
use mkw_records::Guild;
use mkw_records::Player;
use mkw_records::War;
use mkw_records::WarPlayer;

/// Schema metadata for PostgreSQL tables.
///
/// All methods return `&'static str` so DDL is assembled at compile time
/// via [`const_format::concatcp!`] against the table-name constants.
pub trait Schema {
    /// Returns the table name in the database.
    fn name() -> &'static str;
    /// Returns `CREATE TABLE IF NOT EXISTS` DDL.
    fn creates() -> &'static str;
    /// Returns `CREATE INDEX IF NOT EXISTS` statements.
    fn indices() -> &'static str;
}

/// Create all core tables and indices. Safe to run repeatedly.
pub async fn migrate(client: &tokio_postgres::Client) -> Result<(), PgErr> {
    log::info!("running schema migration");
    client.batch_execute(Guild::creates()).await?;
    client.batch_execute(Player::creates()).await?;
    client.batch_execute(War::creates()).await?;
    client.batch_execute(WarPlayer::creates()).await?;
    client.batch_execute(BulkSession::creates()).await?;
    client.batch_execute(BulkResult::creates()).await?;
    client.batch_execute(BulkFailure::creates()).await?;
    client.batch_execute(Guild::indices()).await?;
    client.batch_execute(Player::indices()).await?;
    client.batch_execute(War::indices()).await?;
    client.batch_execute(WarPlayer::indices()).await?;
    client.batch_execute(BulkSession::indices()).await?;
    client.batch_execute(BulkResult::indices()).await?;
    client.batch_execute(BulkFailure::indices()).await?;
    Ok(())
}

impl Schema for Guild {
    fn name() -> &'static str {
        GUILDS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            GUILDS,
            " (
                guild_id        BIGINT PRIMARY KEY,
                guild_name      TEXT NOT NULL,
                ocr_channel_id  BIGINT,
                team_names      TEXT[] NOT NULL DEFAULT '{}',
                is_active       BOOLEAN NOT NULL DEFAULT TRUE,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            GUILDS,
            "_active ON ",
            GUILDS,
            " (guild_id) WHERE is_active;"
        )
    }
}

impl Schema for Player {
    fn name() -> &'static str {
        PLAYERS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            PLAYERS,
            " (
                id             BIGSERIAL PRIMARY KEY,
                guild_id       BIGINT NOT NULL,
                player_name    TEXT NOT NULL,
                nicknames      TEXT[] NOT NULL DEFAULT '{}',
                team_name      TEXT NOT NULL DEFAULT 'Unassigned',
                member_status  TEXT NOT NULL DEFAULT 'member',
                is_active      BOOLEAN NOT NULL DEFAULT TRUE,
                total_score    BIGINT NOT NULL DEFAULT 0,
                total_races    BIGINT NOT NULL DEFAULT 0,
                war_count      DOUBLE PRECISION NOT NULL DEFAULT 0,
                average_score  DOUBLE PRECISION NOT NULL DEFAULT 0,
                last_war_date  TIMESTAMPTZ,
                UNIQUE (guild_id, player_name)
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            PLAYERS,
            "_guild ON ",
            PLAYERS,
            " (guild_id);
             CREATE INDEX IF NOT EXISTS idx_",
            PLAYERS,
            "_team ON ",
            PLAYERS,
            " (guild_id, team_name);"
        )
    }
}

impl Schema for War {
    fn name() -> &'static str {
        WARS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            WARS,
            " (
                war_id       BIGSERIAL PRIMARY KEY,
                guild_id     BIGINT NOT NULL,
                race_count   INTEGER NOT NULL,
                occurred_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            WARS,
            "_guild ON ",
            WARS,
            " (guild_id);
             CREATE INDEX IF NOT EXISTS idx_",
            WARS,
            "_guild_time ON ",
            WARS,
            " (guild_id, occurred_at DESC);"
        )
    }
}

impl Schema for WarPlayer {
    fn name() -> &'static str {
        WAR_PLAYERS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            WAR_PLAYERS,
            " (
                war_id        BIGINT NOT NULL REFERENCES ",
            WARS,
            "(war_id) ON DELETE CASCADE,
                guild_id      BIGINT NOT NULL,
                player_name   TEXT NOT NULL,
                score         INTEGER NOT NULL,
                races_played  INTEGER NOT NULL,
                PRIMARY KEY (war_id, player_name)
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            WAR_PLAYERS,
            "_guild ON ",
            WAR_PLAYERS,
            " (guild_id);
             CREATE INDEX IF NOT EXISTS idx_",
            WAR_PLAYERS,
            "_name ON ",
            WAR_PLAYERS,
            " (guild_id, player_name);"
        )
    }
}

impl Schema for BulkSession {
    fn name() -> &'static str {
        BULK_SESSIONS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            BULK_SESSIONS,
            " (
                session_token   TEXT PRIMARY KEY,
                guild_id        BIGINT NOT NULL,
                created_by      BIGINT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'open',
                total_images    INTEGER NOT NULL DEFAULT 0,
                creation_nonce  TEXT,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
                expires_at      TIMESTAMPTZ NOT NULL
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            BULK_SESSIONS,
            "_guild ON ",
            BULK_SESSIONS,
            " (guild_id);
             CREATE INDEX IF NOT EXISTS idx_",
            BULK_SESSIONS,
            "_expiry ON ",
            BULK_SESSIONS,
            " (expires_at) WHERE status = 'open';
             CREATE UNIQUE INDEX IF NOT EXISTS idx_",
            BULK_SESSIONS,
            "_nonce ON ",
            BULK_SESSIONS,
            " (guild_id, created_by, creation_nonce) WHERE creation_nonce IS NOT NULL;"
        )
    }
}

impl Schema for BulkResult {
    fn name() -> &'static str {
        BULK_RESULTS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            BULK_RESULTS,
            " (
                result_id          BIGSERIAL PRIMARY KEY,
                session_token      TEXT NOT NULL REFERENCES ",
            BULK_SESSIONS,
            "(session_token) ON DELETE CASCADE,
                guild_id           BIGINT NOT NULL,
                image_filename     TEXT NOT NULL,
                image_url          TEXT,
                detected_players   JSONB NOT NULL,
                corrected_players  JSONB,
                review_status      TEXT NOT NULL DEFAULT 'pending',
                race_count         INTEGER NOT NULL,
                message_timestamp  TIMESTAMPTZ
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            BULK_RESULTS,
            "_session ON ",
            BULK_RESULTS,
            " (session_token);
             CREATE INDEX IF NOT EXISTS idx_",
            BULK_RESULTS,
            "_guild ON ",
            BULK_RESULTS,
            " (guild_id);"
        )
    }
}

impl Schema for BulkFailure {
    fn name() -> &'static str {
        BULK_FAILURES
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            BULK_FAILURES,
            " (
                failure_id         BIGSERIAL PRIMARY KEY,
                session_token      TEXT NOT NULL REFERENCES ",
            BULK_SESSIONS,
            "(session_token) ON DELETE CASCADE,
                guild_id           BIGINT NOT NULL,
                image_filename     TEXT NOT NULL,
                image_url          TEXT,
                error_message      TEXT NOT NULL,
                message_timestamp  TIMESTAMPTZ,
                discord_message_id BIGINT
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_",
            BULK_FAILURES,
            "_session ON ",
            BULK_FAILURES,
            " (session_token);
             CREATE INDEX IF NOT EXISTS idx_",
            BULK_FAILURES,
            "_guild ON ",
            BULK_FAILURES,
            " (guild_id);"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_carries_guild_id() {
        // Tenant isolation: all player-facing DDL declares a guild column.
        for ddl in [
            Player::creates(),
            War::creates(),
            WarPlayer::creates(),
            BulkSession::creates(),
            BulkResult::creates(),
            BulkFailure::creates(),
        ] {
            assert!(ddl.contains("guild_id"), "missing guild_id in: {}", ddl);
        }
    }

    #[test]
    fn player_names_unique_per_guild() {
        assert!(Player::creates().contains("UNIQUE (guild_id, player_name)"));
    }

    #[test]
    fn sweep_has_a_partial_expiry_index() {
        assert!(BulkSession::indices().contains("WHERE status = 'open'"));
    }

    #[test]
    fn child_rows_cascade() {
        assert!(WarPlayer::creates().contains("ON DELETE CASCADE"));
        assert!(BulkResult::creates().contains("ON DELETE CASCADE"));
        assert!(BulkFailure::creates().contains("ON DELETE CASCADE"));
    }
}
