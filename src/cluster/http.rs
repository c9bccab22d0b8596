//! HTTP push transport.
//!
//! POSTs each event to `<peer>/cluster/invalidations` on every configured
//! peer. Each attempt has its own timeout; after the last attempt the peer
//! is given up on and its stale entries are left to TTL expiry.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::BroadcastChannel;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::hooks::InvalidationEvent;

pub const INVALIDATION_PATH: &str = "/cluster/invalidations";

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct HttpPeerChannel {
    client: reqwest::Client,
    peers: Vec<String>,
    timeout: Duration,
    attempts: u32,
}

impl HttpPeerChannel {
    pub fn new(peers: Vec<String>, timeout: Duration, attempts: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            peers,
            timeout,
            attempts: attempts.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.peers.clone(),
            config.propagation_timeout(),
            config.propagation_attempts,
        )
    }
}

async fn deliver(
    client: reqwest::Client,
    url: String,
    event: InvalidationEvent,
    timeout: Duration,
    attempts: u32,
) -> std::result::Result<(), String> {
    let mut backoff = INITIAL_BACKOFF;
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let sent = client
            .post(&url)
            .timeout(timeout)
            .json(&event)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match sent {
            Ok(_) => {
                debug!(url = %url, event_id = %event.id, attempt, "delivered invalidation");
                return Ok(());
            }
            Err(e) => {
                last_error = e.to_string();
                debug!(url = %url, attempt, error = %e, "invalidation delivery attempt failed");
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(last_error)
}

#[async_trait]
impl BroadcastChannel for HttpPeerChannel {
    async fn publish(&self, event: &InvalidationEvent) -> Result<()> {
        let mut deliveries = JoinSet::new();
        for peer in &self.peers {
            let url = format!("{peer}{INVALIDATION_PATH}");
            deliveries.spawn({
                let peer = peer.clone();
                let client = self.client.clone();
                let event = event.clone();
                let (timeout, attempts) = (self.timeout, self.attempts);
                async move { (peer, deliver(client, url, event, timeout, attempts).await) }
            });
        }

        let mut unreachable = Vec::new();
        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((peer, Err(error))) => {
                    warn!(peer = %peer, event_id = %event.id, error = %error, "peer unreachable, relying on TTL");
                    unreachable.push(peer);
                }
                Err(e) => {
                    warn!(error = %e, "invalidation delivery task failed");
                    unreachable.push("<task>".to_string());
                }
            }
        }

        if unreachable.is_empty() {
            Ok(())
        } else {
            unreachable.sort();
            Err(CacheError::PropagationDeliveryFailure(unreachable.join(", ")))
        }
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<InvalidationEvent>> {
        None
    }
}
