use std::time::Duration;

/// Process configuration assembled from the environment at startup.
///
/// Required keys panic with a clear message when missing (fail fast,
/// before any connection is opened). Optional OCR tuning keys fall back
/// to the documented defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub chat_token: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_uri: String,
    pub jwt_secret: String,
    pub api_key: String,
    pub cors_origins: Vec<String>,
    pub public_web_url: String,
    pub bind_addr: String,
    /// Where the bot reaches the review API; defaults to the bind
    /// address on localhost.
    pub api_base_url: String,
    pub pool_max: usize,
    pub ocr: OcrTuning,
}

/// Optional OCR engine tuning; unset keys fall back to the defaults.
#[derive(Debug, Clone)]
pub struct OcrTuning {
    /// Startup mode: "balanced", "single_focused", or "bulk_heavy".
    pub mode: String,
    pub express_permits: usize,
    pub standard_permits: usize,
    pub background_permits: usize,
    pub borrowing: bool,
    pub borrow_threshold: f64,
    pub adaptation: bool,
    pub window: Duration,
    pub bulk_threshold: usize,
    pub timeout: Duration,
}

impl Default for OcrTuning {
    fn default() -> Self {
        Self {
            mode: "balanced".to_string(),
            express_permits: super::EXPRESS_PERMITS,
            standard_permits: super::STANDARD_PERMITS,
            background_permits: super::BACKGROUND_PERMITS,
            borrowing: true,
            borrow_threshold: super::BORROW_THRESHOLD,
            adaptation: true,
            window: super::ADAPTATION_WINDOW,
            bulk_threshold: super::BULK_THRESHOLD,
            timeout: super::OCR_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_url: required("DB_URL"),
            chat_token: required("DISCORD_TOKEN"),
            oauth_client_id: required("OAUTH_CLIENT_ID"),
            oauth_client_secret: required("OAUTH_CLIENT_SECRET"),
            oauth_redirect_uri: required("OAUTH_REDIRECT_URI"),
            jwt_secret: required("JWT_SECRET"),
            api_key: required("API_KEY"),
            cors_origins: required("CORS_ORIGINS")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            public_web_url: required("PUBLIC_WEB_URL"),
            bind_addr: required("BIND_ADDR"),
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| format!("http://{}", required("BIND_ADDR"))),
            pool_max: optional("POOL_MAX_CONNECTIONS", super::POOL_MAX_DEFAULT),
            ocr: OcrTuning::from_env(),
        }
    }
}

impl OcrTuning {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mode: std::env::var("OCR_MODE").unwrap_or(defaults.mode),
            express_permits: optional("OCR_EXPRESS_PERMITS", defaults.express_permits),
            standard_permits: optional("OCR_STANDARD_PERMITS", defaults.standard_permits),
            background_permits: optional("OCR_BACKGROUND_PERMITS", defaults.background_permits),
            borrowing: optional("OCR_BORROWING", defaults.borrowing),
            borrow_threshold: optional("OCR_BORROW_THRESHOLD", defaults.borrow_threshold),
            adaptation: optional("OCR_ADAPTATION", defaults.adaptation),
            window: Duration::from_secs(optional(
                "OCR_WINDOW_SECS",
                defaults.window.as_secs(),
            )),
            bulk_threshold: optional("OCR_BULK_THRESHOLD", defaults.bulk_threshold),
            timeout: Duration::from_secs(optional(
                "OCR_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
        }
    }
}

fn required(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("{} must be set", key))
}

fn optional<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuning_defaults() {
        let t = OcrTuning::default();
        assert_eq!(t.express_permits, 4);
        assert_eq!(t.standard_permits, 2);
        assert_eq!(t.background_permits, 1);
        assert_eq!(t.bulk_threshold, 10);
        assert!(t.borrowing);
        assert!(t.adaptation);
        assert_eq!(t.mode, "balanced");
    }

    #[test]
    fn optional_falls_back_on_garbage() {
        unsafe { std::env::set_var("MKW_TEST_OPTIONAL", "not-a-number") };
        assert_eq!(optional("MKW_TEST_OPTIONAL", 7usize), 7);
        unsafe { std::env::remove_var("MKW_TEST_OPTIONAL") };
    }
}
