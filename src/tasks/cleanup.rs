//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries, stale
//! invalidation tombstones and old duplicate-suppression records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::cluster::{InvalidationPropagator, SEEN_RETENTION};

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between cleanup runs. TTL expiry is only a safety net; active
/// invalidation removes entries long before they expire.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), propagator.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: Arc<CacheStore>,
    propagator: Arc<InvalidationPropagator>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired();
            let forgotten = propagator.prune_seen(SEEN_RETENTION);

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
            if forgotten > 0 {
                debug!("TTL cleanup: forgot {} applied invalidation ids", forgotten);
            }
        }
    })
}
