use super::Claims;
use super::Crypto;
use super::SessionRepository;
use actix_web::FromRequest;
use actix_web::HttpRequest;
use actix_web::dev::Payload;
use actix_web::web;
use mkw_database::Db;
use std::future::Future;
use std::pin::Pin;

/// Shared secret for bot-to-API calls, injected as app data.
#[derive(Clone)]
pub struct ApiKeySecret(pub String);

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Extractor for authenticated user requests.
/// Validates the JWT and checks the session is not revoked or expired.
pub struct Auth(pub Claims);

impl Auth {
    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

impl FromRequest for Auth {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let crypto = req.app_data::<web::Data<Crypto>>().cloned();
        let db = req.app_data::<web::Data<Db>>().cloned();
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_owned());
        Box::pin(async move {
            let header = header.ok_or_else(|| {
                actix_web::error::ErrorUnauthorized("missing authorization header")
            })?;
            let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                actix_web::error::ErrorUnauthorized("invalid authorization format")
            })?;
            let crypto = crypto.ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("token service not configured")
            })?;
            let claims = crypto
                .decode(token)
                .map_err(|_| actix_web::error::ErrorUnauthorized("invalid token"))?;
            if claims.expired() {
                return Err(actix_web::error::ErrorUnauthorized("token expired"));
            }
            let db = db.ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("database not configured")
            })?;
            let client = db
                .get()
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("database error"))?;
            // The lookup matches on the token's hash, so only the exact
            // token issued for this session row authenticates.
            let hash = Crypto::hash(token);
            let revoked = client
                .session_revoked(claims.session(), &hash)
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("database error"))?
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("session not found"))?;
            if revoked {
                return Err(actix_web::error::ErrorUnauthorized("session revoked"));
            }
            Ok(Auth(claims))
        })
    }
}

/// Extractor for API-key requests. Trusted for any guild.
pub struct ApiKey;

impl FromRequest for ApiKey {
    type Error = actix_web::Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let configured = req.app_data::<web::Data<ApiKeySecret>>();
        let presented = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok());
        std::future::ready(match (configured, presented) {
            (Some(secret), Some(key)) if key == secret.0 => Ok(ApiKey),
            (_, Some(_)) => Err(actix_web::error::ErrorUnauthorized("invalid api key")),
            _ => Err(actix_web::error::ErrorUnauthorized("missing api key")),
        })
    }
}

/// Union extractor for endpoints serving both surfaces: the API key wins
/// when its header is present, otherwise the bearer path runs.
pub enum Caller {
    Service,
    User(Claims),
}

impl Caller {
    pub fn can_view(&self, guild: mkw_core::GuildId) -> bool {
        match self {
            Self::Service => true,
            Self::User(claims) => claims.can_view(guild),
        }
    }
    pub fn can_manage(&self, guild: mkw_core::GuildId) -> bool {
        match self {
            Self::Service => true,
            Self::User(claims) => claims.can_manage(guild),
        }
    }
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;
    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let has_key = req.headers().contains_key(API_KEY_HEADER);
        let key = ApiKey::from_request(req, payload);
        let auth = Auth::from_request(req, payload);
        Box::pin(async move {
            if has_key {
                key.await.map(|_| Caller::Service)
            } else {
                auth.await.map(|Auth(claims)| Caller::User(claims))
            }
        })
    }
}
