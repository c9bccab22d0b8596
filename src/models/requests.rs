//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::MAX_KEY_LENGTH;

/// Longest credential key that still fits in a cache key with its namespace.
const MAX_CREDENTIAL_KEY_LENGTH: usize = MAX_KEY_LENGTH - "credentials:".len();

fn validate_credential_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_CREDENTIAL_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_CREDENTIAL_KEY_LENGTH
        ));
    }
    None
}

/// Request body for POST /consumers
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConsumerRequest {
    pub username: String,
}

impl CreateConsumerRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.username.trim().is_empty() {
            return Some("Username cannot be empty".to_string());
        }
        None
    }
}

/// Request body for PATCH /consumers/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsumerPatch {
    #[serde(default)]
    pub username: Option<String>,
}

impl ConsumerPatch {
    pub fn validate(&self) -> Option<String> {
        match &self.username {
            Some(username) if username.trim().is_empty() => {
                Some("Username cannot be empty".to_string())
            }
            _ => None,
        }
    }
}

/// Request body for POST /consumers/:id/credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCredentialRequest {
    pub key: String,
    #[serde(default)]
    pub secret: String,
}

impl CreateCredentialRequest {
    pub fn validate(&self) -> Option<String> {
        validate_credential_key(&self.key)
    }
}

/// Request body for PATCH /credentials/:id
///
/// Setting `key` rotates the credential's public identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialPatch {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl CredentialPatch {
    pub fn validate(&self) -> Option<String> {
        self.key.as_deref().and_then(validate_credential_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_credential_deserialize() {
        let json = r#"{"key": "key123", "secret": "secret123"}"#;
        let req: CreateCredentialRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "key123");
        assert_eq!(req.secret, "secret123");
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_credential_patch_partial() {
        let patch: CredentialPatch = serde_json::from_str(r#"{"key": "keyhello"}"#).unwrap();
        assert_eq!(patch.key.as_deref(), Some("keyhello"));
        assert!(patch.secret.is_none());
    }

    #[test]
    fn test_validate_empty_key() {
        let req = CreateCredentialRequest {
            key: "".to_string(),
            secret: "s".to_string(),
        };
        assert!(req.validate().is_some());

        let patch = CredentialPatch {
            key: Some(String::new()),
            secret: None,
        };
        assert!(patch.validate().is_some());
    }

    #[test]
    fn test_validate_key_too_long() {
        let req = CreateCredentialRequest {
            key: "x".repeat(MAX_CREDENTIAL_KEY_LENGTH + 1),
            secret: String::new(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_blank_username() {
        let req = CreateConsumerRequest {
            username: "  ".to_string(),
        };
        assert!(req.validate().is_some());
        assert!(ConsumerPatch::default().validate().is_none());
    }
}
