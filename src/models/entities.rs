//! Domain entities mirrored from the persistent store.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity types tracked by the invalidation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Credential,
    Consumer,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Credential => write!(f, "credential"),
            EntityType::Consumer => write!(f, "consumer"),
        }
    }
}

/// The principal that owns credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: Uuid,
    pub username: String,
}

impl Consumer {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
        }
    }
}

/// An API key credential.
///
/// `key` is what an inbound request presents and is unique among active credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub key: String,
    pub secret: String,
    pub consumer_id: Uuid,
}

impl Credential {
    pub fn new(consumer_id: Uuid, key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            secret: secret.into(),
            consumer_id,
        }
    }
}

/// Consumer context embedded in a cached credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerContext {
    pub id: Uuid,
    pub username: String,
}

impl From<&Consumer> for ConsumerContext {
    fn from(consumer: &Consumer) -> Self {
        Self {
            id: consumer.id,
            username: consumer.username.clone(),
        }
    }
}

/// Everything the proxy path needs to authenticate a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    pub credential: Credential,
    pub consumer: ConsumerContext,
}

impl CredentialSnapshot {
    pub fn new(credential: Credential, consumer: &Consumer) -> Self {
        Self {
            credential,
            consumer: consumer.into(),
        }
    }
}
