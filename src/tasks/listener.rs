//! Invalidation Listener Task
//!
//! Applies invalidation events received from the cluster broadcast channel.

use std::sync::Arc;

use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cluster::InvalidationPropagator;
use crate::hooks::InvalidationEvent;

/// Spawns a task that applies every event arriving on `events` to the local cache.
///
/// If the receiver lags behind, the skipped events are lost for this node;
/// the affected entries fall back to TTL expiry. The task ends when the
/// channel closes.
pub fn spawn_invalidation_listener(
    propagator: Arc<InvalidationPropagator>,
    mut events: Receiver<InvalidationEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(node = %propagator.node_id(), "Invalidation listener started");

        loop {
            match events.recv().await {
                Ok(event) => {
                    propagator.apply(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Invalidation listener lagged, relying on TTL for skipped events");
                }
                Err(RecvError::Closed) => {
                    info!("Invalidation channel closed, listener stopping");
                    break;
                }
            }
        }
    })
}
