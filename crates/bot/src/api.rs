use mkw_core::GuildId;
use mkw_core::UserId;

/// Failures calling the review API.
#[derive(Debug)]
pub enum ApiError {
    Transport(reqwest::Error),
    Status(u16, String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "review api unreachable: {}", e),
            Self::Status(code, body) => write!(f, "review api returned {}: {}", code, body),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

/// Bot-side client for the review API, authenticated with the shared
/// key. Only session creation goes over HTTP; result and failure
/// appends use the store directly so they can batch.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    key: String,
}

#[derive(serde::Deserialize)]
struct CreatedSession {
    session_token: String,
}

impl ApiClient {
    pub fn new(base: String, key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            key,
        }
    }

    pub async fn create_session(
        &self,
        guild: GuildId,
        created_by: UserId,
        total_images: usize,
    ) -> Result<String, ApiError> {
        let response = self
            .http
            .post(format!("{}/bulk/sessions", self.base))
            .header(API_KEY_HEADER, &self.key)
            .json(&serde_json::json!({
                "guild_id": guild,
                "created_by_user_id": created_by,
                "total_images": total_images as i32,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(code, body));
        }
        let created: CreatedSession = response.json().await?;
        Ok(created.session_token)
    }
}

/// Header name shared with the API; kept in sync with the auth crate
/// without dragging it into the bot.
const API_KEY_HEADER: &str = "X-API-Key";
