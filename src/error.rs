//! Error types for the credential cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::storage::StoreError;

// == Cache Error Enum ==
/// Unified error type for the credential cache service.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache key not present (introspection miss)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Presented credential or referenced entity does not exist
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unique constraint violated in the persistent store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Persistent store unreachable or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A peer could not be reached while fanning out an invalidation
    #[error("Propagation delivery failed: {0}")]
    PropagationDeliveryFailure(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => CacheError::EntityNotFound(msg),
            StoreError::Conflict(msg) => CacheError::Conflict(msg),
            StoreError::Unavailable(msg) => CacheError::StoreUnavailable(msg),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Internal(format!("snapshot serialization: {err}"))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Introspection misses carry no body
            CacheError::NotFound(_) => return StatusCode::NOT_FOUND.into_response(),
            CacheError::EntityNotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            CacheError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            CacheError::PropagationDeliveryFailure(_) | CacheError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the credential cache.
pub type Result<T> = std::result::Result<T, CacheError>;
