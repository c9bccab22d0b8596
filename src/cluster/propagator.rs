//! Applies invalidation events locally and fans them out to the cluster.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::BroadcastChannel;
use crate::cache::CacheStore;
use crate::hooks::InvalidationEvent;

/// How long an applied event id is remembered for duplicate suppression.
pub const SEEN_RETENTION: Duration = Duration::from_secs(60);

/// Result of applying an event to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Keys were deleted; the count is how many entries were actually present
    Applied { removed: usize },
    /// The event id was applied before
    Duplicate,
}

pub struct InvalidationPropagator {
    node_id: String,
    cache: Arc<CacheStore>,
    channel: Arc<dyn BroadcastChannel>,
    /// Event ids already applied on this node
    seen: DashMap<Uuid, Instant>,
}

impl InvalidationPropagator {
    pub fn new(node_id: impl Into<String>, cache: Arc<CacheStore>, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self {
            node_id: node_id.into(),
            cache,
            channel,
            seen: DashMap::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn channel(&self) -> &Arc<dyn BroadcastChannel> {
        &self.channel
    }

    /// Invalidates the event's keys on this node, then publishes it.
    ///
    /// Publishing runs in the background; the returned handle completes when
    /// every peer has been delivered to or given up on. Callers are free to
    /// drop it.
    pub fn propagate(self: &Arc<Self>, event: InvalidationEvent) -> JoinHandle<()> {
        self.apply(&event);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.channel.publish(&event).await {
                Ok(()) => debug!(event_id = %event.id, "invalidation published"),
                Err(e) => warn!(event_id = %event.id, error = %e, "invalidation fan-out incomplete"),
            }
        })
    }

    /// Deletes every key listed in the event from the local cache.
    ///
    /// Repeated deliveries of the same event are skipped.
    pub fn apply(&self, event: &InvalidationEvent) -> ApplyOutcome {
        if self.seen.insert(event.id, Instant::now()).is_some() {
            debug!(event_id = %event.id, "duplicate invalidation ignored");
            return ApplyOutcome::Duplicate;
        }

        let removed = event
            .affected_cache_keys
            .iter()
            .filter(|key| self.cache.delete(key))
            .count();

        info!(
            event_id = %event.id,
            origin = %event.origin_node,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            keys = event.affected_cache_keys.len(),
            removed,
            "applied invalidation"
        );
        ApplyOutcome::Applied { removed }
    }

    /// Forgets event ids older than `retention`. Returns how many were dropped.
    pub fn prune_seen(&self, retention: Duration) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, applied_at| applied_at.elapsed() < retention);
        before.saturating_sub(self.seen.len())
    }
}
