//! Domain records for guild rosters, wars, and bulk review sessions.
//!
//! Plain data carriers with their validation and the scoring arithmetic
//! that every persistence path must apply transactionally.
//!
//! ## Core Types
//!
//! - [`Guild`] — Tenant configuration (channel, team names)
//! - [`Player`] — Roster member with derived aggregates
//! - [`War`] — One race session and its per-player lines
//! - [`BulkSession`] / [`BulkResult`] / [`BulkFailure`] — Review batch state
//!
//! ## Enums
//!
//! - [`MemberStatus`] — Member / Trial / Ally / Kicked
//! - [`SessionStatus`] — open / confirmed / cancelled / expired
//! - [`ReviewStatus`] — pending / approved / rejected
//! - [`Outcome`] — won / lost / tied, from the team differential
mod bulk;
mod error;
mod guild;
mod player;
mod status;
mod war;

pub use bulk::*;
pub use error::*;
pub use guild::*;
pub use player::*;
pub use status::*;
pub use war::*;
