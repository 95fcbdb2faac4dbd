//! PostgreSQL persistence for rosters, wars, and review sessions.
//!
//! Hand-written SQL against prepared statements; one repository trait per
//! concern, implemented generically over [`tokio_postgres::GenericClient`]
//! so the same queries run on a pooled connection and inside a
//! transaction.
//!
//! ## Connectivity
//!
//! - [`pool()`] — deadpool-managed connections from a database URL
//!
//! ## Schema
//!
//! - [`Schema`] — Table metadata and DDL generation
//! - [`migrate()`] — Idempotent DDL at startup
//!
//! ## Repositories
//!
//! - [`GuildRepository`] — Tenant configuration
//! - [`RosterRepository`] — Players, nicknames, teams, aggregates
//! - [`war`] — Transactional war insert/remove/append
//! - [`stats`] — Leaderboards and per-player standings
//!
//! ## Table Names
//!
//! Constants for all persistent entities, shared with the crates that own
//! further tables (bulk sessions, auth sessions).
mod pool;
mod retry;
mod roster;
mod schema;

pub mod stats;
pub mod war;

pub use pool::*;
pub use retry::*;
pub use roster::*;
pub use schema::*;

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;

/// Re-exported so callers can pick transaction isolation without a
/// direct tokio-postgres dependency.
pub use tokio_postgres::IsolationLevel;

/// Table for tenant (guild) configuration.
#[rustfmt::skip]
pub const GUILDS:        &str = "guild_configs";
/// Table for roster members and their derived aggregates.
#[rustfmt::skip]
pub const PLAYERS:       &str = "players";
/// Table for confirmed war sessions.
#[rustfmt::skip]
pub const WARS:          &str = "wars";
/// Table for per-player lines within a war.
#[rustfmt::skip]
pub const WAR_PLAYERS:   &str = "war_players";
/// Table for bulk review sessions.
#[rustfmt::skip]
pub const BULK_SESSIONS: &str = "bulk_scan_sessions";
/// Table for per-image OCR outputs under review.
#[rustfmt::skip]
pub const BULK_RESULTS:  &str = "bulk_scan_results";
/// Table for per-image OCR failures under review.
#[rustfmt::skip]
pub const BULK_FAILURES: &str = "bulk_scan_failures";
/// Table for signed review-API sessions.
#[rustfmt::skip]
pub const USER_SESSIONS: &str = "user_sessions";
