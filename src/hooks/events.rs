//! Typed mutation and invalidation events.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::credential_key;
use crate::models::{Consumer, Credential, EntityType};

/// A committed change to a tracked entity.
///
/// Carries the state needed to work out which cache keys went stale; for
/// updates that is the state before the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent {
    CredentialCreated { credential: Credential },
    CredentialUpdated { old: Credential, new: Credential },
    CredentialDeleted { credential: Credential },
    ConsumerCreated { consumer: Consumer },
    ConsumerUpdated { old: Consumer, new: Consumer, credentials: Vec<Credential> },
    /// `credentials` are the ones the consumer owned just before deletion.
    ConsumerDeleted { consumer: Consumer, credentials: Vec<Credential> },
}

impl MutationEvent {
    pub fn entity_type(&self) -> EntityType {
        match self {
            MutationEvent::CredentialCreated { .. }
            | MutationEvent::CredentialUpdated { .. }
            | MutationEvent::CredentialDeleted { .. } => EntityType::Credential,
            MutationEvent::ConsumerCreated { .. }
            | MutationEvent::ConsumerUpdated { .. }
            | MutationEvent::ConsumerDeleted { .. } => EntityType::Consumer,
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            MutationEvent::CredentialCreated { credential }
            | MutationEvent::CredentialDeleted { credential } => credential.id,
            MutationEvent::CredentialUpdated { old, .. } => old.id,
            MutationEvent::ConsumerCreated { consumer }
            | MutationEvent::ConsumerDeleted { consumer, .. } => consumer.id,
            MutationEvent::ConsumerUpdated { old, .. } => old.id,
        }
    }

    /// Cache keys that may hold state this mutation made stale.
    pub fn affected_keys(&self) -> BTreeSet<String> {
        match self {
            // Clears any negative entry left by lookups before the key existed
            MutationEvent::CredentialCreated { credential } => {
                BTreeSet::from([credential_key(&credential.key)])
            }
            // A rotated-to key may still hold a negative entry
            MutationEvent::CredentialUpdated { old, new } => {
                let mut keys = BTreeSet::from([credential_key(&old.key)]);
                if old.key != new.key {
                    keys.insert(credential_key(&new.key));
                }
                keys
            }
            MutationEvent::CredentialDeleted { credential } => {
                BTreeSet::from([credential_key(&credential.key)])
            }
            MutationEvent::ConsumerCreated { .. } => BTreeSet::new(),
            // Snapshots embed the username
            MutationEvent::ConsumerUpdated { old, new, credentials } => {
                if old.username == new.username {
                    BTreeSet::new()
                } else {
                    credentials.iter().map(|c| credential_key(&c.key)).collect()
                }
            }
            MutationEvent::ConsumerDeleted { credentials, .. } => {
                credentials.iter().map(|c| credential_key(&c.key)).collect()
            }
        }
    }
}

/// Cluster-wide instruction to purge cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub affected_cache_keys: BTreeSet<String>,
    pub origin_node: String,
    pub origin_timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(
        entity_type: EntityType,
        entity_id: Uuid,
        affected_cache_keys: BTreeSet<String>,
        origin_node: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            entity_id,
            affected_cache_keys,
            origin_node: origin_node.into(),
            origin_timestamp: Utc::now(),
        }
    }

    pub fn from_mutation(mutation: &MutationEvent, origin_node: impl Into<String>) -> Self {
        Self::new(
            mutation.entity_type(),
            mutation.entity_id(),
            mutation.affected_keys(),
            origin_node,
        )
    }
}
