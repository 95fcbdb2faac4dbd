use super::Crypto;
use super::GuildGrant;
use mkw_core::GuildId;
use mkw_core::ID;
use mkw_core::Unique;
use mkw_core::UserId;
use std::collections::HashMap;

/// Persisted review-API session backing token revocation.
#[derive(Debug, Clone)]
pub struct Session {
    id: ID<Self>,
    user: UserId,
    hash: Vec<u8>,
    guilds: HashMap<GuildId, GuildGrant>,
    expires: std::time::SystemTime,
    revoked: bool,
}

impl Unique for Session {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Session {
    pub fn new(
        id: ID<Self>,
        user: UserId,
        hash: Vec<u8>,
        guilds: HashMap<GuildId, GuildGrant>,
    ) -> Self {
        Self {
            id,
            user,
            hash,
            guilds,
            expires: std::time::SystemTime::now() + Crypto::duration(),
            revoked: false,
        }
    }
    pub fn user(&self) -> UserId {
        self.user
    }
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
    pub fn guilds(&self) -> &HashMap<GuildId, GuildGrant> {
        &self.guilds
    }
    pub fn expires_at(&self) -> std::time::SystemTime {
        self.expires
    }
    pub fn revoked(&self) -> bool {
        self.revoked
    }
}

mod schema {
    use super::Session;
    use mkw_database::Schema;
    use mkw_database::USER_SESSIONS;

    impl Schema for Session {
        fn name() -> &'static str {
            USER_SESSIONS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                USER_SESSIONS,
                " (
                    id          UUID PRIMARY KEY,
                    user_id     BIGINT NOT NULL,
                    token_hash  BYTEA NOT NULL,
                    guilds      JSONB NOT NULL DEFAULT '{}',
                    expires_at  TIMESTAMPTZ NOT NULL,
                    revoked     BOOLEAN DEFAULT FALSE
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_",
                USER_SESSIONS,
                "_user ON ",
                USER_SESSIONS,
                " (user_id);
                 CREATE INDEX IF NOT EXISTS idx_",
                USER_SESSIONS,
                "_expires ON ",
                USER_SESSIONS,
                " (expires_at) WHERE NOT revoked;"
            )
        }
    }
}
