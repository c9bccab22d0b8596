//! Read-through loading of credential snapshots.
//!
//! On a miss the credential and its consumer are fetched from the entity
//! store and cached. The write goes through [`CacheStore::set_if_fresh`] with
//! a fence taken before the lookup, so a load that raced an invalidation is
//! discarded instead of cached. Each load, both store calls together, is
//! bounded by `load_timeout`, which the store's tombstone retention must
//! exceed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{credential_key, parse_key, CacheEntry, CacheStore, Lookup};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{CredentialSnapshot, EntityType};
use crate::storage::EntityStore;

pub struct ReadThroughLoader {
    cache: Arc<CacheStore>,
    store: Arc<dyn EntityStore>,
    ttl: u64,
    negative_ttl: u64,
    load_timeout: Duration,
}

impl ReadThroughLoader {
    pub fn new(
        cache: Arc<CacheStore>,
        store: Arc<dyn EntityStore>,
        ttl: u64,
        negative_ttl: u64,
        load_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            ttl,
            negative_ttl,
            load_timeout,
        }
    }

    pub fn from_config(cache: Arc<CacheStore>, store: Arc<dyn EntityStore>, config: &Config) -> Self {
        Self::new(
            cache,
            store,
            config.default_ttl,
            config.negative_ttl,
            config.load_timeout(),
        )
    }

    /// Resolves a presented API key to its snapshot, loading on a miss.
    ///
    /// Unknown keys yield `EntityNotFound`; a failing store yields
    /// `StoreUnavailable` so the caller can fail closed.
    pub async fn authenticate_by_key(&self, presented_key: &str) -> Result<CredentialSnapshot> {
        let cache_key = credential_key(presented_key);

        match self.cache.get(&cache_key) {
            Lookup::Hit(value) => match serde_json::from_str(&value) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    warn!(key = %cache_key, error = %e, "discarding undecodable cache entry");
                    self.cache.delete(&cache_key);
                }
            },
            Lookup::Negative => {
                return Err(CacheError::EntityNotFound(format!(
                    "credential '{presented_key}'"
                )))
            }
            Lookup::Miss => {}
        }

        self.load_and_cache(&cache_key)
            .await?
            .ok_or_else(|| CacheError::EntityNotFound(format!("credential '{presented_key}'")))
    }

    /// Loads the entity behind `cache_key` from the store and caches it.
    ///
    /// Returns `Ok(None)` when the entity does not exist; that result is
    /// cached as a negative entry for `negative_ttl`.
    pub async fn load_and_cache(&self, cache_key: &str) -> Result<Option<CredentialSnapshot>> {
        let key = match parse_key(cache_key) {
            Some((EntityType::Credential, key)) => key,
            _ => {
                return Err(CacheError::InvalidRequest(format!(
                    "'{cache_key}' is not a credential cache key"
                )))
            }
        };

        let fence = self.cache.fence();
        let snapshot = self.bounded(self.fetch_snapshot(key)).await?;

        let entry = match &snapshot {
            Some(snapshot) => CacheEntry::new(serde_json::to_string(snapshot)?, Some(self.ttl)),
            None => CacheEntry::negative(self.negative_ttl),
        };

        if self.cache.set_if_fresh(cache_key.to_string(), entry, fence)? {
            debug!(key = %cache_key, found = snapshot.is_some(), "cached store lookup");
        } else {
            debug!(key = %cache_key, "key invalidated during load, result not cached");
        }
        Ok(snapshot)
    }

    async fn fetch_snapshot(&self, key: &str) -> Result<Option<CredentialSnapshot>> {
        let Some(credential) = self.store.load_credential_by_key(key).await? else {
            return Ok(None);
        };

        match self.store.load_consumer(credential.consumer_id).await? {
            Some(consumer) => Ok(Some(CredentialSnapshot::new(credential, &consumer))),
            None => {
                warn!(credential_id = %credential.id, "credential references a missing consumer");
                Ok(None)
            }
        }
    }

    /// Bounds the whole fetch, not each store call, so a load never
    /// outlives `load_timeout`.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.load_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::StoreUnavailable(format!(
                    "lookup exceeded {}ms",
                    self.load_timeout.as_millis()
                )))
            })
    }
}
