//! Priority-scheduled OCR execution engine.
//!
//! Arbitrates limited CPU between interactive single-image scans and bulk
//! batches: one counting semaphore per priority tier, permit borrowing
//! from idle lower tiers, an adaptive mode monitor over a rolling usage
//! window, and a lossy metrics ring.
//!
//! ## Core Types
//!
//! - [`Engine`] — Permit scheduling, timeouts, and backend dispatch
//! - [`Tier`] — EXPRESS / STANDARD / BACKGROUND priorities
//! - [`Backend`] — The pluggable `bytes → text boxes` OCR function
//! - [`Monitor`] — Rolling-window mode selection with hysteresis
//! - [`Metrics`] — Append-only scan telemetry ring
//!
//! ## Submodules
//!
//! - [`parse`] — Score-row extraction from raw text boxes
mod backend;
mod engine;
mod metrics;
mod monitor;
mod tesseract;

pub mod parse;

pub use backend::*;
pub use engine::*;
pub use metrics::*;
pub use monitor::*;
pub use tesseract::*;
