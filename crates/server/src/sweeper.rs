//! Periodic removal of expired key/value entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use grabber_core::SqliteKvStore;

/// Purge expired entries every `interval` until `cancel` fires.
pub fn spawn_sweeper(
    store: Arc<SqliteKvStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match store.purge_expired() {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Purged expired entries"),
                Err(e) => warn!(error = %e, "Failed to purge expired entries"),
            }
        }

        info!("Sweeper stopped");
    })
}
