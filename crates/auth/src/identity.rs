use super::GuildGrant;
use mkw_core::GuildId;
use mkw_core::UserId;
use std::collections::HashMap;

/// What the OAuth provider vouches for: who the user is, and which
/// guilds they may see or manage.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub guilds: HashMap<GuildId, GuildGrant>,
}

/// Failures from the identity exchange.
#[derive(Debug)]
pub enum IdentityError {
    Denied,
    Provider(String),
    Transport(reqwest::Error),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied => write!(f, "authorization code rejected"),
            Self::Provider(s) => write!(f, "identity provider error: {}", s),
            Self::Transport(e) => write!(f, "identity provider unreachable: {}", e),
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

/// The chat platform's OAuth service, behind a seam so the API can be
/// exercised without the platform.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an OAuth authorization code for a verified identity.
    async fn exchange(&self, code: &str) -> Result<Identity, IdentityError>;
}

const PLATFORM_API: &str = "https://discord.com/api/v10";
/// Guild permission bits as the platform defines them.
const PERM_ADMINISTRATOR: u64 = 1 << 3;
const PERM_MANAGE_GUILD: u64 = 1 << 5;

/// Production provider: code → platform token → user + guild list.
pub struct PlatformIdentity {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl PlatformIdentity {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }
}

#[derive(serde::Deserialize)]
struct TokenGrant {
    access_token: String,
}

#[derive(serde::Deserialize)]
struct PlatformUser {
    id: String,
}

#[derive(serde::Deserialize)]
struct PlatformGuild {
    id: String,
    name: String,
    owner: bool,
    permissions: String,
}

#[async_trait::async_trait]
impl IdentityProvider for PlatformIdentity {
    async fn exchange(&self, code: &str) -> Result<Identity, IdentityError> {
        let grant = self
            .http
            .post(format!("{}/oauth2/token", PLATFORM_API))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        if !grant.status().is_success() {
            return Err(IdentityError::Denied);
        }
        let grant: TokenGrant = grant.json().await?;
        let bearer = format!("Bearer {}", grant.access_token);
        let user: PlatformUser = self
            .http
            .get(format!("{}/users/@me", PLATFORM_API))
            .header("Authorization", &bearer)
            .send()
            .await?
            .json()
            .await?;
        let guilds: Vec<PlatformGuild> = self
            .http
            .get(format!("{}/users/@me/guilds", PLATFORM_API))
            .header("Authorization", &bearer)
            .send()
            .await?
            .json()
            .await?;
        let user_id = user
            .id
            .parse::<UserId>()
            .map_err(|_| IdentityError::Provider("non-numeric user id".to_string()))?;
        let guilds = guilds
            .into_iter()
            .filter_map(|g| {
                let id = g.id.parse::<GuildId>().ok()?;
                let bits = g.permissions.parse::<u64>().unwrap_or(0);
                Some((
                    id,
                    GuildGrant {
                        is_admin: g.owner || bits & PERM_ADMINISTRATOR != 0,
                        can_manage: g.owner
                            || bits & (PERM_ADMINISTRATOR | PERM_MANAGE_GUILD) != 0,
                        guild_name: g.name,
                    },
                ))
            })
            .collect();
        Ok(Identity { user_id, guilds })
    }
}
