//! Background token refresh
//!
//! Spawns a task that alternates between a fixed sleep and one fetch. A
//! failed fetch is logged and the previous token stays current; the next
//! attempt happens after the same fixed interval, never sooner.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info};

use crate::slot::TokenSlot;
use crate::source::TokenSource;

/// Refresh period used when none is configured (4 minutes)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(240);

/// Result of one fetch attempt.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new token was published into the slot.
    Refreshed,
    /// The fetch failed; the slot still holds the previous token.
    Failed(trendminer_auth::Error),
}

/// Fetch one token and publish it on success.
///
/// Never panics and never clears the slot. The outcome is returned so
/// callers can inspect it; the refresh task discards it after logging.
pub async fn refresh_once(source: &dyn TokenSource, slot: &TokenSlot) -> RefreshOutcome {
    match source.fetch_token().await {
        Ok(token) => {
            slot.publish(token);
            metrics::counter!("token_refresh_total", "outcome" => "success").increment(1);
            metrics::gauge!("token_refresh_last_success_timestamp_seconds").set(unix_now_secs());
            info!("Refreshed token.");
            RefreshOutcome::Refreshed
        }
        Err(e) => {
            metrics::counter!("token_refresh_total", "outcome" => "failure").increment(1);
            error!(
                error = %e,
                auth_rejected = e.is_auth_rejection(),
                "Token refresh failed: {e}"
            );
            RefreshOutcome::Failed(e)
        }
    }
}

/// Spawn the periodic refresh task.
///
/// The slot must already hold the bootstrap token, so the first fetch
/// happens one `interval` after spawning. The task runs until `shutdown` is
/// cancelled; cancellation is observed during the sleep, and an in-flight
/// fetch is allowed to finish first.
pub fn spawn_refresh_task(
    source: Arc<dyn TokenSource>,
    slot: TokenSlot,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            info!(interval_secs = interval.as_secs(), "token refresh task started");
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        info!("token refresh task stopped");
                        return;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }

                // Outcome is already logged; the interval does not depend on it.
                let _ = refresh_once(source.as_ref(), &slot).await;
            }
        }
        .in_current_span(),
    )
}

fn unix_now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
