//! In-memory entity store.
//!
//! Used by the binary when no external store is wired in, and by tests. It
//! can simulate an outage and slow lookups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{ConsumerChange, ConsumerRemoval, CredentialChange, EntityStore, StoreError, StoreResult};
use crate::models::{Consumer, ConsumerPatch, Credential, CredentialPatch};

#[derive(Debug, Default)]
struct Tables {
    consumers: HashMap<Uuid, Consumer>,
    credentials: HashMap<Uuid, Credential>,
    /// Unique index on `Credential::key`
    by_key: HashMap<String, Uuid>,
}

impl Tables {
    /// Credentials owned by a consumer, ordered by key.
    fn owned_by(&self, consumer_id: Uuid) -> Vec<Credential> {
        let mut owned: Vec<Credential> = self
            .credentials
            .values()
            .filter(|c| c.consumer_id == consumer_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.key.cmp(&b.key));
        owned
    }
}

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    load_delay_ms: AtomicU64,
    credential_loads: AtomicUsize,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `StoreError::Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays the read-through lookups (credential by key, consumer by id)
    /// after the row has been read, so the returned value reflects the state
    /// at the start of the call.
    pub fn set_load_delay(&self, delay: Duration) {
        self.load_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of credential-by-key lookups served so far.
    pub fn credential_loads(&self) -> usize {
        self.credential_loads.load(Ordering::SeqCst)
    }

    async fn delay_load(&self, what: &str) {
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            debug!(lookup = what, delay_ms = delay, "delaying lookup");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn load_credential_by_key(&self, key: &str) -> StoreResult<Option<Credential>> {
        self.check_available()?;
        self.credential_loads.fetch_add(1, Ordering::SeqCst);

        let found = {
            let tables = self.tables.read().await;
            tables
                .by_key
                .get(key)
                .and_then(|id| tables.credentials.get(id))
                .cloned()
        };

        self.delay_load("credential").await;
        Ok(found)
    }

    async fn load_credential(&self, id: Uuid) -> StoreResult<Option<Credential>> {
        self.check_available()?;
        Ok(self.tables.read().await.credentials.get(&id).cloned())
    }

    async fn load_credentials_by_consumer(&self, consumer_id: Uuid) -> StoreResult<Vec<Credential>> {
        self.check_available()?;
        Ok(self.tables.read().await.owned_by(consumer_id))
    }

    async fn load_consumer(&self, id: Uuid) -> StoreResult<Option<Consumer>> {
        self.check_available()?;
        let found = self.tables.read().await.consumers.get(&id).cloned();
        self.delay_load("consumer").await;
        Ok(found)
    }

    async fn insert_consumer(&self, consumer: Consumer) -> StoreResult<Consumer> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if tables
            .consumers
            .values()
            .any(|c| c.username == consumer.username)
        {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                consumer.username
            )));
        }
        tables.consumers.insert(consumer.id, consumer.clone());
        Ok(consumer)
    }

    async fn update_consumer(&self, id: Uuid, patch: ConsumerPatch) -> StoreResult<ConsumerChange> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let old = tables
            .consumers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("consumer {id}")))?;

        let mut new = old.clone();
        if let Some(username) = patch.username {
            if tables
                .consumers
                .values()
                .any(|c| c.username == username && c.id != id)
            {
                return Err(StoreError::Conflict(format!(
                    "username '{username}' already exists"
                )));
            }
            new.username = username;
        }
        tables.consumers.insert(id, new.clone());

        let credentials = tables.owned_by(id);
        Ok(ConsumerChange {
            old,
            new,
            credentials,
        })
    }

    async fn delete_consumer(&self, id: Uuid) -> StoreResult<ConsumerRemoval> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let consumer = tables
            .consumers
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("consumer {id}")))?;

        let credentials = tables.owned_by(id);
        for credential in &credentials {
            tables.credentials.remove(&credential.id);
            tables.by_key.remove(&credential.key);
        }
        Ok(ConsumerRemoval {
            consumer,
            credentials,
        })
    }

    async fn insert_credential(&self, credential: Credential) -> StoreResult<Credential> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.consumers.contains_key(&credential.consumer_id) {
            return Err(StoreError::NotFound(format!(
                "consumer {}",
                credential.consumer_id
            )));
        }
        if tables.by_key.contains_key(&credential.key) {
            return Err(StoreError::Conflict(format!(
                "key '{}' already exists",
                credential.key
            )));
        }
        tables.by_key.insert(credential.key.clone(), credential.id);
        tables.credentials.insert(credential.id, credential.clone());
        Ok(credential)
    }

    async fn update_credential(&self, id: Uuid, patch: CredentialPatch) -> StoreResult<CredentialChange> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let old = tables
            .credentials
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("credential {id}")))?;

        let mut new = old.clone();
        if let Some(secret) = patch.secret {
            new.secret = secret;
        }
        if let Some(key) = patch.key.filter(|key| *key != old.key) {
            if tables.by_key.contains_key(&key) {
                return Err(StoreError::Conflict(format!("key '{key}' already exists")));
            }
            tables.by_key.remove(&old.key);
            tables.by_key.insert(key.clone(), id);
            new.key = key;
        }
        tables.credentials.insert(id, new.clone());

        Ok(CredentialChange { old, new })
    }

    async fn delete_credential(&self, id: Uuid) -> StoreResult<Credential> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let credential = tables
            .credentials
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("credential {id}")))?;
        tables.by_key.remove(&credential.key);
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryEntityStore, Consumer, Credential) {
        let store = MemoryEntityStore::new();
        let consumer = store.insert_consumer(Consumer::new("bob")).await.unwrap();
        let credential = store
            .insert_credential(Credential::new(consumer.id, "key123", "secret123"))
            .await
            .unwrap();
        (store, consumer, credential)
    }

    #[tokio::test]
    async fn test_load_by_key() {
        let (store, _, credential) = seeded().await;

        let loaded = store.load_credential_by_key("key123").await.unwrap();
        assert_eq!(loaded, Some(credential));
        assert_eq!(store.load_credential_by_key("nope").await.unwrap(), None);
        assert_eq!(store.credential_loads(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_key_conflicts() {
        let (store, consumer, _) = seeded().await;

        let result = store
            .insert_credential(Credential::new(consumer.id, "key123", "other"))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_rotates_key_index() {
        let (store, _, credential) = seeded().await;
        let patch = CredentialPatch {
            key: Some("keyhello".to_string()),
            secret: None,
        };

        let change = store.update_credential(credential.id, patch).await.unwrap();

        assert_eq!(change.old, credential);
        assert_eq!(change.new.key, "keyhello");
        assert_eq!(store.load_credential_by_key("key123").await.unwrap(), None);
        assert_eq!(
            store.load_credential_by_key("keyhello").await.unwrap(),
            Some(change.new)
        );
    }

    #[tokio::test]
    async fn test_successive_rotations_report_previous_key() {
        let (store, _, credential) = seeded().await;
        let rotate = |key: &str| CredentialPatch {
            key: Some(key.to_string()),
            secret: None,
        };

        store.update_credential(credential.id, rotate("k2")).await.unwrap();
        let second = store.update_credential(credential.id, rotate("k3")).await.unwrap();

        assert_eq!(second.old.key, "k2");
        assert_eq!(second.new.key, "k3");
    }

    #[tokio::test]
    async fn test_rotation_to_taken_key_conflicts() {
        let (store, consumer, credential) = seeded().await;
        store
            .insert_credential(Credential::new(consumer.id, "taken", "s"))
            .await
            .unwrap();

        let patch = CredentialPatch {
            key: Some("taken".to_string()),
            secret: None,
        };
        let result = store.update_credential(credential.id, patch).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.load_credential_by_key("key123").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_reports_owned_credentials() {
        let (store, consumer, credential) = seeded().await;
        let patch = ConsumerPatch {
            username: Some("robert".to_string()),
        };

        let change = store.update_consumer(consumer.id, patch).await.unwrap();

        assert_eq!(change.old.username, "bob");
        assert_eq!(change.new.username, "robert");
        assert_eq!(change.credentials, vec![credential]);
    }

    #[tokio::test]
    async fn test_delete_consumer_cascades() {
        let (store, consumer, credential) = seeded().await;
        let removal = store.delete_consumer(consumer.id).await.unwrap();

        assert_eq!(removal.consumer, consumer);
        assert_eq!(removal.credentials, vec![credential.clone()]);
        assert_eq!(store.load_credential(credential.id).await.unwrap(), None);
        assert_eq!(store.load_credential_by_key("key123").await.unwrap(), None);
        assert!(store
            .load_credentials_by_consumer(consumer.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_credential_returns_row() {
        let (store, _, credential) = seeded().await;

        let removed = store.delete_credential(credential.id).await.unwrap();

        assert_eq!(removed, credential);
        assert!(matches!(
            store.delete_credential(credential.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let (store, _, _) = seeded().await;
        store.set_unavailable(true);

        let result = store.load_credential_by_key("key123").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.set_unavailable(false);
        assert!(store.load_credential_by_key("key123").await.is_ok());
    }
}
