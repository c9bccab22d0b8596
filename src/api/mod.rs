//! API Module
//!
//! HTTP handlers and routing for a gateway node.
//!
//! # Endpoints
//! - `GET /proxy` - Authenticate by API key (read-through)
//! - `GET /cache/:key` - Introspect a cache key
//! - Admin mutation routes under `/consumers` and `/credentials`
//! - `POST /cluster/invalidations` - Peer invalidation delivery
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
