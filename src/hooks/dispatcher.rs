//! Entity mutation hooks.
//!
//! Every admin write goes through [`HookDispatcher`]. Each operation commits
//! the write to the entity store, builds the [`MutationEvent`] from the
//! prior state the store returned for that commit, and only then hands its
//! invalidation to the propagator. A failed commit emits nothing.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{InvalidationEvent, MutationEvent};
use crate::cluster::InvalidationPropagator;
use crate::error::Result;
use crate::models::{Consumer, ConsumerPatch, Credential, CredentialPatch};
use crate::storage::EntityStore;

pub struct HookDispatcher {
    store: Arc<dyn EntityStore>,
    propagator: Arc<InvalidationPropagator>,
}

impl HookDispatcher {
    pub fn new(store: Arc<dyn EntityStore>, propagator: Arc<InvalidationPropagator>) -> Self {
        Self { store, propagator }
    }

    pub async fn create_consumer(&self, username: String) -> Result<Consumer> {
        let consumer = self.store.insert_consumer(Consumer::new(username)).await?;
        self.dispatch(MutationEvent::ConsumerCreated {
            consumer: consumer.clone(),
        });
        Ok(consumer)
    }

    pub async fn update_consumer(&self, id: Uuid, patch: ConsumerPatch) -> Result<Consumer> {
        let change = self.store.update_consumer(id, patch).await?;
        let new = change.new.clone();

        self.dispatch(MutationEvent::ConsumerUpdated {
            old: change.old,
            new: change.new,
            credentials: change.credentials,
        });
        Ok(new)
    }

    /// Deletes a consumer and, with it, every credential it owns.
    pub async fn delete_consumer(&self, id: Uuid) -> Result<()> {
        let removal = self.store.delete_consumer(id).await?;

        self.dispatch(MutationEvent::ConsumerDeleted {
            consumer: removal.consumer,
            credentials: removal.credentials,
        });
        Ok(())
    }

    /// New credentials are not pre-loaded; the first lookup is a normal miss.
    pub async fn create_credential(&self, consumer_id: Uuid, key: String, secret: String) -> Result<Credential> {
        let credential = self
            .store
            .insert_credential(Credential::new(consumer_id, key, secret))
            .await?;
        self.dispatch(MutationEvent::CredentialCreated {
            credential: credential.clone(),
        });
        Ok(credential)
    }

    pub async fn update_credential(&self, id: Uuid, patch: CredentialPatch) -> Result<Credential> {
        let change = self.store.update_credential(id, patch).await?;
        let new = change.new.clone();

        self.dispatch(MutationEvent::CredentialUpdated {
            old: change.old,
            new: change.new,
        });
        Ok(new)
    }

    pub async fn delete_credential(&self, id: Uuid) -> Result<()> {
        let credential = self.store.delete_credential(id).await?;
        self.dispatch(MutationEvent::CredentialDeleted { credential });
        Ok(())
    }

    /// Turns a committed mutation into an invalidation and propagates it.
    ///
    /// Returns the event, or `None` when the mutation affects no cache keys.
    pub fn dispatch(&self, mutation: MutationEvent) -> Option<InvalidationEvent> {
        let event = InvalidationEvent::from_mutation(&mutation, self.propagator.node_id());
        if event.affected_cache_keys.is_empty() {
            return None;
        }

        info!(
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            keys = ?event.affected_cache_keys,
            "mutation committed, invalidating"
        );
        self.propagator.propagate(event.clone());
        Some(event)
    }
}
