//! Persistent entity store seam.
//!
//! The authoritative store lives outside this crate. The cache only needs
//! lookups by credential key and by consumer, and the writes the mutation
//! hooks wrap.

mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Consumer, ConsumerPatch, Credential, CredentialPatch};

pub use memory::MemoryEntityStore;

/// Errors returned by the persistent store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A committed credential update with the row as it was just before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialChange {
    pub old: Credential,
    pub new: Credential,
}

/// A committed consumer update.
///
/// `credentials` are the consumer's credentials at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerChange {
    pub old: Consumer,
    pub new: Consumer,
    pub credentials: Vec<Credential>,
}

/// A deleted consumer and the credentials removed along with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRemoval {
    pub consumer: Consumer,
    pub credentials: Vec<Credential>,
}

/// Authoritative source of consumers and credentials.
///
/// Lookups return `Ok(None)` for a missing entity; `Err` is reserved for
/// failures of the store itself.
///
/// Writes return the state they replaced, read under the same lock as the
/// write. Invalidations are derived from that state, never from an earlier
/// read that a concurrent write could have made stale.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load_credential_by_key(&self, key: &str) -> StoreResult<Option<Credential>>;

    async fn load_credential(&self, id: Uuid) -> StoreResult<Option<Credential>>;

    async fn load_credentials_by_consumer(&self, consumer_id: Uuid) -> StoreResult<Vec<Credential>>;

    async fn load_consumer(&self, id: Uuid) -> StoreResult<Option<Consumer>>;

    async fn insert_consumer(&self, consumer: Consumer) -> StoreResult<Consumer>;

    async fn update_consumer(&self, id: Uuid, patch: ConsumerPatch) -> StoreResult<ConsumerChange>;

    /// Deletes a consumer and every credential it owns.
    async fn delete_consumer(&self, id: Uuid) -> StoreResult<ConsumerRemoval>;

    /// Fails with `Conflict` if another credential already uses the key.
    async fn insert_credential(&self, credential: Credential) -> StoreResult<Credential>;

    /// Fails with `Conflict` if the patch rotates to a key already in use.
    async fn update_credential(&self, id: Uuid, patch: CredentialPatch) -> StoreResult<CredentialChange>;

    /// Returns the removed row.
    async fn delete_credential(&self, id: Uuid) -> StoreResult<Credential>;
}
