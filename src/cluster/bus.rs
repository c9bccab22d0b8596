//! In-process broadcast transport.
//!
//! Every node holding a clone of the bus receives every event, including the
//! publisher. Used when several nodes share one process, and in tests.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use super::BroadcastChannel;
use crate::error::Result;
use crate::hooks::InvalidationEvent;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct InProcessBus {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastChannel for InProcessBus {
    async fn publish(&self, event: &InvalidationEvent) -> Result<()> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(event_id = %event.id, receivers, "published invalidation"),
            Err(_) => debug!(event_id = %event.id, "no subscribers for invalidation"),
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<InvalidationEvent>> {
        Some(self.sender.subscribe())
    }
}
