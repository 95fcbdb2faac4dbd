//! Authentication for the review API.
//!
//! Bearer tokens are JWTs signed by this service, minted after the chat
//! platform's OAuth provider vouches for the user; each token carries the
//! user's per-guild permissions. The bot authenticates with a shared API
//! key instead and is trusted for any guild.
//!
//! ## Core Types
//!
//! - [`Crypto`] — JWT encode/decode and token hashing
//! - [`Claims`] — `(user, session, guild → permissions)` payload
//! - [`Session`] — Persisted session row backing revocation
//! - [`Auth`] / [`ApiKey`] / [`Caller`] — actix-web extractors
//! - [`IdentityProvider`] — The OAuth black box behind a trait
mod claims;
mod crypto;
mod extract;
mod identity;
mod repository;
mod session;

pub use claims::*;
pub use crypto::*;
pub use extract::*;
pub use identity::*;
pub use repository::*;
pub use session::*;
