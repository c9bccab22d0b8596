//! Cluster-wide invalidation fan-out.
//!
//! An [`InvalidationEvent`] is applied to the originating node's cache and
//! then published over a [`BroadcastChannel`]. Delivery is at-least-once;
//! receivers only ever delete keys, so a late or repeated delivery cannot
//! undo a newer invalidation.
//!
//! ```text
//! Node A: mutation committed
//!   ↓ apply locally, publish
//! Channel: InvalidationEvent { affected_cache_keys, .. }
//!   ↓
//! Node B: listener → delete keys
//! Node C: listener → delete keys
//! ```

mod bus;
mod http;
mod propagator;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::hooks::InvalidationEvent;

pub use bus::InProcessBus;
pub use http::HttpPeerChannel;
pub use propagator::{ApplyOutcome, InvalidationPropagator, SEEN_RETENTION};

/// Transport for invalidation events between nodes.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Sends an event to every other node.
    ///
    /// Unreachable nodes are reported as `PropagationDeliveryFailure` after a
    /// bounded number of attempts; reachable ones are still delivered to.
    async fn publish(&self, event: &InvalidationEvent) -> Result<()>;

    /// Stream of events published by other nodes, for pull-style transports.
    ///
    /// Push transports deliver through the HTTP receive endpoint instead and
    /// return `None`.
    fn subscribe(&self) -> Option<broadcast::Receiver<InvalidationEvent>>;
}
