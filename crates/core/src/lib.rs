//! Core type aliases, traits, and constants for the war-ingestion backend.
//!
//! This crate provides the foundational types and configuration parameters
//! used throughout the workspace.
#![allow(dead_code)]

mod config;

pub use config::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Chat-platform guild identifier (snowflake, tenant boundary).
pub type GuildId = i64;
/// Chat-platform user identifier (snowflake).
pub type UserId = i64;
/// Chat-platform channel identifier (snowflake).
pub type ChannelId = i64;
/// Chat-platform message identifier (snowflake).
pub type MessageId = i64;
/// War row identifier (BIGSERIAL).
pub type WarId = i64;
/// Bulk result row identifier (BIGSERIAL).
pub type ResultId = i64;
/// Bulk failure row identifier (BIGSERIAL).
pub type FailureId = i64;
/// Per-player score within one war.
pub type Score = i32;
/// Race counts and races-played values.
pub type Races = i32;

// ============================================================================
// TRAITS
// ============================================================================
/// Unique identifier trait for uuid-keyed entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
///
/// Domain rows (guilds, players, wars) are integer-keyed; this wrapper is
/// for uuid-keyed rows such as auth sessions.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast ID<T> to ID<U> while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

// ============================================================================
// SCORING PARAMETERS
// ============================================================================
/// Breakeven score per race per player; a war above this average is won.
pub const BREAKEVEN_PER_RACE: Score = 41;
/// Races per war when no override is supplied.
pub const DEFAULT_RACE_COUNT: Races = 12;
/// Smallest accepted race count for a war.
pub const MIN_RACE_COUNT: Races = 1;
/// Largest accepted race count for a war.
pub const MAX_RACE_COUNT: Races = 24;
/// Largest accepted per-player score.
pub const MAX_SCORE: Score = 999;

// ============================================================================
// OCR SCHEDULING
// ============================================================================
/// Default permit count for the EXPRESS (interactive) tier.
pub const EXPRESS_PERMITS: usize = 4;
/// Default permit count for the STANDARD (small bulk) tier.
pub const STANDARD_PERMITS: usize = 2;
/// Default permit count for the BACKGROUND (large bulk) tier.
pub const BACKGROUND_PERMITS: usize = 1;
/// Bulk scans with at least this many images run at BACKGROUND priority.
pub const BULK_THRESHOLD: usize = 10;
/// Donor utilization above which permit borrowing is refused.
pub const BORROW_THRESHOLD: f64 = 0.8;
/// Rolling observation window for the adaptive mode monitor.
pub const ADAPTATION_WINDOW: std::time::Duration = std::time::Duration::from_secs(60 * 60);
/// Wall-clock budget per OCR submission, queue wait included.
pub const OCR_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
/// Extra permits granted to the favored tier when a non-balanced mode engages.
pub const MODE_BOOST: usize = 2;

// ============================================================================
// BULK REVIEW SESSIONS
// ============================================================================
/// How long a bulk session stays reviewable after creation.
pub const SESSION_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);
/// Interval between expiry sweeps over open sessions.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15 * 60);
/// Most images one bulk scan command will collect from a channel.
pub const BULK_SCAN_LIMIT: usize = 100;
/// Upper bound on session rows written in one bot transaction.
pub const WRITE_BATCH_SIZE: usize = 10;
/// The bot flushes a partial write batch this long after the last completion.
pub const WRITE_BATCH_FLUSH: std::time::Duration = std::time::Duration::from_millis(500);

// ============================================================================
// SERVICE LIMITS
// ============================================================================
/// Server-side timeout on review API requests.
pub const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
/// Upper bound on one confirm-session transaction.
pub const CONFIRM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
/// Attempts for retryable storage operations (serialization failures).
pub const RETRY_ATTEMPTS: usize = 3;
/// Base delay for exponential retry backoff.
pub const RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);
/// Default connection-pool size.
pub const POOL_MAX_DEFAULT: usize = 10;
/// Lifetime of a signed review-session token.
pub const AUTH_TOKEN_DURATION: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Global interrupt flag for graceful shutdown coordination.
#[cfg(feature = "server")]
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if graceful shutdown was requested via SIGINT.
#[cfg(feature = "server")]
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
}
/// No-op interrupt check when server feature disabled.
#[cfg(not(feature = "server"))]
pub fn interrupted() -> bool {
    false
}

/// Register a Ctrl+C handler that raises the interrupt flag so long-lived
/// loops can flush and exit.
#[cfg(feature = "server")]
pub fn trap() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("install signal handler");
        log::warn!("interrupt received, finishing in-flight work");
        INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
    });
}
