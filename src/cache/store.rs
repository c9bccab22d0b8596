//! Cache Store Module
//!
//! Sharded in-memory store holding credential snapshots with TTL expiration
//! and per-key invalidation fences.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::stats::StatsCounters;
use crate::cache::{CacheEntry, CacheStats, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

/// Default time a tombstone is kept after an invalidation.
pub const DEFAULT_TOMBSTONE_RETENTION: Duration = Duration::from_secs(4);

// == Lookup ==
/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A live snapshot
    Hit(String),
    /// A live record that the entity does not exist
    Negative,
    /// Nothing usable cached
    Miss,
}

/// Per-key state: the cached entry plus the last invalidation stamp.
#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    /// Sequence number of the last invalidation, 0 if never invalidated
    invalidated_seq: u64,
    /// When the last invalidation happened (Unix milliseconds)
    invalidated_at: u64,
}

impl Slot {
    fn keeps_tombstone(&self, now_ms: u64, retention_ms: u64) -> bool {
        self.invalidated_seq > 0 && now_ms.saturating_sub(self.invalidated_at) < retention_ms
    }
}

// == Cache Store ==
/// Concurrent cache storage with TTL support.
///
/// Every key is independently atomic; there is no lock over the whole store.
/// `delete` leaves a tombstone so that a load which started before the
/// delete cannot write its result afterwards (see [`CacheStore::set_if_fresh`]).
#[derive(Debug)]
pub struct CacheStore {
    slots: DashMap<String, Slot>,
    /// Source of invalidation sequence numbers
    sequence: AtomicU64,
    /// Number of slots currently holding an entry
    live: AtomicUsize,
    stats: StatsCounters,
    max_entries: usize,
    default_ttl: u64,
    tombstone_retention: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self {
            slots: DashMap::new(),
            sequence: AtomicU64::new(0),
            live: AtomicUsize::new(0),
            stats: StatsCounters::default(),
            max_entries,
            default_ttl,
            tombstone_retention: DEFAULT_TOMBSTONE_RETENTION,
        }
    }

    /// Sets how long invalidation tombstones are kept.
    ///
    /// Must be longer than the longest read-through load.
    pub fn with_tombstone_retention(mut self, retention: Duration) -> Self {
        self.tombstone_retention = retention;
        self
    }

    // == Get ==
    /// Looks up a key. Never blocks on I/O and never mutates the map.
    ///
    /// Expired entries read as a miss and are left for the cleanup task.
    pub fn get(&self, key: &str) -> Lookup {
        let now = current_timestamp_ms();
        let lookup = match self.slots.get(key) {
            Some(slot) => match &slot.entry {
                Some(entry) if !entry.is_expired_at(now) => {
                    if entry.negative {
                        Lookup::Negative
                    } else {
                        Lookup::Hit(entry.value.clone())
                    }
                }
                _ => Lookup::Miss,
            },
            None => Lookup::Miss,
        };

        match lookup {
            Lookup::Hit(_) => self.stats.record_hit(),
            Lookup::Negative => self.stats.record_negative_hit(),
            Lookup::Miss => self.stats.record_miss(),
        }
        lookup
    }

    /// Returns a copy of the live entry for a key without touching statistics.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        let now = current_timestamp_ms();
        self.slots
            .get(key)
            .and_then(|slot| slot.entry.clone())
            .filter(|entry| !entry.is_expired_at(now))
    }

    // == Set ==
    /// Stores a value unconditionally.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The serialized snapshot
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&self, key: String, value: String, ttl: Option<u64>) -> Result<()> {
        let entry = CacheEntry::new(value, Some(ttl.unwrap_or(self.default_ttl)));
        self.insert_entry(key, entry, None).map(|_| ())
    }

    /// Current invalidation sequence. Take it before starting a load and pass
    /// it to [`CacheStore::set_if_fresh`].
    pub fn fence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Stores an entry unless the key was invalidated after `fence` was taken.
    ///
    /// Returns `Ok(false)` when the write was refused.
    pub fn set_if_fresh(&self, key: String, entry: CacheEntry, fence: u64) -> Result<bool> {
        self.insert_entry(key, entry, Some(fence))
    }

    fn insert_entry(&self, key: String, entry: CacheEntry, fence: Option<u64>) -> Result<bool> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if entry.value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        if self.len() >= self.max_entries && self.peek(&key).is_none() {
            self.make_room();
        }

        match self.slots.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if fence.is_some_and(|fence| slot.invalidated_seq > fence) {
                    self.stats.record_stale_rejection();
                    return Ok(false);
                }
                if slot.entry.replace(entry).is_none() {
                    self.live.fetch_add(1, Ordering::SeqCst);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    entry: Some(entry),
                    ..Slot::default()
                });
                self.live.fetch_add(1, Ordering::SeqCst);
            }
        }

        self.stats.record_insert();
        Ok(true)
    }

    /// Frees at least one entry: expired ones first, otherwise the oldest.
    fn make_room(&self) {
        if self.cleanup_expired() > 0 {
            return;
        }

        let oldest = self
            .slots
            .iter()
            .filter_map(|item| {
                item.value()
                    .entry
                    .as_ref()
                    .map(|entry| (entry.created_at, item.key().clone()))
            })
            .min();

        if let Some((_, key)) = oldest {
            if let Some(mut slot) = self.slots.get_mut(&key) {
                if slot.entry.take().is_some() {
                    self.live.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }
    }

    // == Delete ==
    /// Removes the entry for a key and stamps an invalidation tombstone.
    ///
    /// Idempotent. Returns true if an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let now = current_timestamp_ms();

        let mut slot = self.slots.entry(key.to_string()).or_default();
        slot.invalidated_seq = seq;
        slot.invalidated_at = now;
        let removed = slot.entry.take().is_some();
        drop(slot);

        if removed {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.stats.record_invalidation();
        removed
    }

    // == List By Prefix ==
    /// Returns the keys of live entries starting with `prefix`.
    pub fn list_by_prefix(&self, prefix: &str) -> Vec<String> {
        let now = current_timestamp_ms();
        let mut keys: Vec<String> = self
            .slots
            .iter()
            .filter(|item| item.key().starts_with(prefix))
            .filter(|item| {
                item.value()
                    .entry
                    .as_ref()
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .map(|item| item.key().clone())
            .collect();
        keys.sort();
        keys
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }

    // == Cleanup Expired ==
    /// Removes expired entries and tombstones past their retention.
    ///
    /// Returns the number of expired entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let retention_ms = self.tombstone_retention.as_millis() as u64;
        let mut expired = 0;

        self.slots.retain(|_, slot| {
            if slot.entry.as_ref().is_some_and(|e| e.is_expired_at(now)) {
                slot.entry = None;
                expired += 1;
            }
            slot.entry.is_some() || slot.keeps_tombstone(now, retention_ms)
        });

        if expired > 0 {
            self.live.fetch_sub(expired, Ordering::SeqCst);
            self.stats.record_expirations(expired);
        }
        expired
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::sleep;

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, 300);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();

        assert_eq!(store.get("key1"), Lookup::Hit("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = CacheStore::new(100, 300);
        assert_eq!(store.get("nonexistent"), Lookup::Miss);
    }

    #[test]
    fn test_store_delete() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        assert!(store.delete("key1"));

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), Lookup::Miss);
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(!store.delete("never-set"));

        assert_eq!(store.get("key1"), Lookup::Miss);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_overwrite() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        store.set("key1".to_string(), "value2".to_string(), None).unwrap();

        assert_eq!(store.get("key1"), Lookup::Hit("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_negative_entry() {
        let store = CacheStore::new(100, 300);
        let fence = store.fence();

        assert!(store
            .set_if_fresh("missing".to_string(), CacheEntry::negative(30), fence)
            .unwrap());

        assert_eq!(store.get("missing"), Lookup::Negative);
        assert_eq!(store.stats().negative_hits, 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), Some(1)).unwrap();
        assert!(matches!(store.get("key1"), Lookup::Hit(_)));

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), Lookup::Miss);
        assert!(store.peek("key1").is_none());
    }

    #[test]
    fn test_set_if_fresh_rejects_after_invalidation() {
        let store = CacheStore::new(100, 300);
        store.set("k".to_string(), "old".to_string(), None).unwrap();

        // A load begins, then the key is invalidated before it finishes
        let fence = store.fence();
        store.delete("k");

        let stored = store
            .set_if_fresh("k".to_string(), CacheEntry::new("old".to_string(), Some(60)), fence)
            .unwrap();

        assert!(!stored);
        assert_eq!(store.get("k"), Lookup::Miss);
        assert_eq!(store.stats().stale_rejections, 1);
    }

    #[test]
    fn test_set_if_fresh_accepts_after_new_fence() {
        let store = CacheStore::new(100, 300);
        store.delete("k");

        let fence = store.fence();
        let stored = store
            .set_if_fresh("k".to_string(), CacheEntry::new("new".to_string(), Some(60)), fence)
            .unwrap();

        assert!(stored);
        assert_eq!(store.get("k"), Lookup::Hit("new".to_string()));
    }

    #[test]
    fn test_invalidation_of_other_key_does_not_reject() {
        let store = CacheStore::new(100, 300);
        let fence = store.fence();
        store.delete("other");

        let stored = store
            .set_if_fresh("k".to_string(), CacheEntry::new("v".to_string(), Some(60)), fence)
            .unwrap();
        assert!(stored);
    }

    #[test]
    fn test_list_by_prefix() {
        let store = CacheStore::new(100, 300);
        store.set("credentials:a".to_string(), "1".to_string(), None).unwrap();
        store.set("credentials:b".to_string(), "2".to_string(), None).unwrap();
        store.set("consumers:c".to_string(), "3".to_string(), None).unwrap();
        store.delete("credentials:b");

        assert_eq!(store.list_by_prefix("credentials:"), vec!["credentials:a"]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = CacheStore::new(2, 300);
        store.set("a".to_string(), "1".to_string(), None).unwrap();
        sleep(Duration::from_millis(5));
        store.set("b".to_string(), "2".to_string(), None).unwrap();
        sleep(Duration::from_millis(5));
        store.set("c".to_string(), "3".to_string(), None).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Lookup::Miss);
        assert!(matches!(store.get("c"), Lookup::Hit(_)));
    }

    #[test]
    fn test_store_stats() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        store.get("key1");
        store.get("nonexistent");
        store.delete("key1");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let store = CacheStore::new(100, 300);

        store.set("key1".to_string(), "value1".to_string(), Some(1)).unwrap();
        store.set("key2".to_string(), "value2".to_string(), Some(10)).unwrap();

        sleep(Duration::from_millis(1100));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(matches!(store.get("key2"), Lookup::Hit(_)));
    }

    #[test]
    fn test_cleanup_keeps_recent_tombstones() {
        let store = CacheStore::new(100, 300).with_tombstone_retention(Duration::from_secs(60));
        store.set("k".to_string(), "v".to_string(), None).unwrap();
        let fence = store.fence();
        store.delete("k");

        store.cleanup_expired();

        let stored = store
            .set_if_fresh("k".to_string(), CacheEntry::new("v".to_string(), None), fence)
            .unwrap();
        assert!(!stored, "tombstone must survive cleanup within retention");
    }

    #[test]
    fn test_cleanup_prunes_old_tombstones() {
        let store = CacheStore::new(100, 300).with_tombstone_retention(Duration::from_millis(10));
        store.delete("k");
        sleep(Duration::from_millis(30));

        store.cleanup_expired();

        assert_eq!(store.slots.len(), 0);
    }

    #[test]
    fn test_store_key_too_long() {
        let store = CacheStore::new(100, 300);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.set(long_key, "value".to_string(), None);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_value_too_large() {
        let store = CacheStore::new(100, 300);
        let large_value = "x".repeat(MAX_VALUE_SIZE + 1);

        let result = store.set("key".to_string(), large_value, None);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_concurrent_readers_and_invalidator() {
        let store = Arc::new(CacheStore::new(1000, 300));
        store.set("hot".to_string(), "v".to_string(), None).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let _ = store.get("hot");
                    }
                })
            })
            .collect();

        store.delete("hot");
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(store.get("hot"), Lookup::Miss);
        assert_eq!(store.stats().hits + store.stats().misses, 4001);
    }
}
