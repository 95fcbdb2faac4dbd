use super::Crypto;
use super::Session;
use mkw_core::GuildId;
use mkw_core::ID;
use mkw_core::UserId;
use std::collections::HashMap;

/// Per-guild permissions carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GuildGrant {
    pub is_admin: bool,
    pub can_manage: bool,
    pub guild_name: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub sid: uuid::Uuid,
    pub gld: HashMap<GuildId, GuildGrant>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user: UserId, session: ID<Session>, guilds: HashMap<GuildId, GuildGrant>) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_secs() as i64;
        Self {
            sub: user,
            sid: session.inner(),
            gld: guilds,
            iat: now,
            exp: now + Crypto::duration().as_secs() as i64,
        }
    }
    pub fn expired(&self) -> bool {
        self.exp
            < std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time")
                .as_secs() as i64
    }
    pub fn user(&self) -> UserId {
        self.sub
    }
    pub fn session(&self) -> ID<Session> {
        ID::from(self.sid)
    }
    pub fn guilds(&self) -> &HashMap<GuildId, GuildGrant> {
        &self.gld
    }
    /// Membership alone grants read access within the guild.
    pub fn can_view(&self, guild: GuildId) -> bool {
        self.gld.contains_key(&guild)
    }
    pub fn can_manage(&self, guild: GuildId) -> bool {
        self.gld.get(&guild).is_some_and(|g| g.can_manage || g.is_admin)
    }
    pub fn is_admin(&self, guild: GuildId) -> bool {
        self.gld.get(&guild).is_some_and(|g| g.is_admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        let mut guilds = HashMap::new();
        guilds.insert(
            1,
            GuildGrant {
                is_admin: false,
                can_manage: true,
                guild_name: "A".to_string(),
            },
        );
        guilds.insert(
            2,
            GuildGrant {
                is_admin: false,
                can_manage: false,
                guild_name: "B".to_string(),
            },
        );
        Claims::new(9, ID::default(), guilds)
    }

    #[test]
    fn view_requires_membership() {
        let c = claims();
        assert!(c.can_view(1));
        assert!(c.can_view(2));
        assert!(!c.can_view(3));
    }

    #[test]
    fn manage_requires_grant() {
        let c = claims();
        assert!(c.can_manage(1));
        assert!(!c.can_manage(2));
        assert!(!c.can_manage(3));
    }

    #[test]
    fn admin_implies_manage() {
        let mut guilds = HashMap::new();
        guilds.insert(
            5,
            GuildGrant {
                is_admin: true,
                can_manage: false,
                guild_name: "C".to_string(),
            },
        );
        let c = Claims::new(9, ID::default(), guilds);
        assert!(c.is_admin(5));
        assert!(c.can_manage(5));
    }

    #[test]
    fn guild_keys_survive_json() {
        let c = claims();
        let json = serde_json::to_string(&c).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.guilds(), c.guilds());
    }
}
