//! Domain entities and the request/response models for the HTTP API
//!
//! Entities mirror the persistent store; DTOs define the JSON bodies of the
//! admin, proxy and introspection endpoints.

pub mod entities;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use entities::{Consumer, ConsumerContext, Credential, CredentialSnapshot, EntityType};
pub use requests::{ConsumerPatch, CreateConsumerRequest, CreateCredentialRequest, CredentialPatch};
pub use responses::{AuthenticatedResponse, ErrorResponse, HealthResponse, MessageResponse, StatsResponse};
