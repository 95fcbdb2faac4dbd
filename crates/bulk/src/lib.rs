//! Bulk review session store.
//!
//! Persists OCR outputs and failures for a review batch, serves the
//! review operations, and atomically materializes approved results into
//! war records.
//!
//! ## Core Types
//!
//! - [`SessionStore`] — All session operations over the shared pool
//! - [`SessionError`] — Store failures mapped to HTTP statuses upstream
//! - [`Confirmation`] — Outcome of a confirm: created war ids, in order
//!
//! ## Lifecycle
//!
//! Sessions open with a 24 h TTL; review mutations are gated on
//! open-and-unexpired; confirm and cancel are terminal; a background
//! [`sweeper`] expires overdue sessions every 15 minutes.
mod error;
mod store;
mod sweep;
mod token;

pub use error::*;
pub use store::*;
pub use sweep::*;
pub use token::*;
