//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStats;
use crate::models::CredentialSnapshot;

/// Body returned by the proxy path when a request is authenticated
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedResponse {
    pub consumer_id: Uuid,
    pub consumer_username: String,
    pub credential_id: Uuid,
}

impl From<&CredentialSnapshot> for AuthenticatedResponse {
    fn from(snapshot: &CredentialSnapshot) -> Self {
        Self {
            consumer_id: snapshot.consumer.id,
            consumer_username: snapshot.consumer.username.clone(),
            credential_id: snapshot.credential.id,
        }
    }
}

/// Body for gateway-level rejections (`{"message": ...}`)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub node_id: String,
    #[serde(flatten)]
    pub cache: CacheStats,
    /// Hit rate ((hits + negative hits) / lookups)
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(node_id: impl Into<String>, cache: CacheStats) -> Self {
        let hit_rate = cache.hit_rate();
        Self {
            node_id: node_id.into(),
            cache,
            hit_rate,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Consumer, Credential};

    #[test]
    fn test_authenticated_response_from_snapshot() {
        let consumer = Consumer::new("bob");
        let credential = Credential::new(consumer.id, "key123", "secret123");
        let snapshot = CredentialSnapshot::new(credential.clone(), &consumer);

        let resp = AuthenticatedResponse::from(&snapshot);
        assert_eq!(resp.consumer_username, "bob");
        assert_eq!(resp.credential_id, credential.id);

        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("secret123"), "secrets never leave the gateway");
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let resp = StatsResponse::new("node-a", CacheStats::default());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["node_id"], "node-a");
        assert_eq!(json["hits"], 0);
        assert_eq!(json["hit_rate"], 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_message_response_serialize() {
        let json = serde_json::to_string(&MessageResponse::new("Invalid authentication credentials")).unwrap();
        assert_eq!(json, r#"{"message":"Invalid authentication credentials"}"#);
    }
}
