//! Periodic access token refresh
//!
//! Keeps a single current bearer token fresh for the life of the process.
//! The launcher fetches the first token itself, publishes it into a
//! `TokenSlot`, and then hands the slot to the refresh task.
//!
//! Refresh lifecycle:
//! 1. Bootstrap fetch populates the slot (fatal on failure, done by the caller)
//! 2. `spawn_refresh_task()` sleeps a fixed interval
//! 3. `refresh_once()` fetches; success overwrites the slot, failure is logged
//! 4. Back to 2 until the `CancellationToken` fires

pub mod refresh;
pub mod slot;
pub mod source;

pub use refresh::{DEFAULT_REFRESH_INTERVAL, RefreshOutcome, refresh_once, spawn_refresh_task};
pub use slot::TokenSlot;
pub use source::TokenSource;
pub use trendminer_auth::AccessToken;
