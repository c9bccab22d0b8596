//! Credential Cache - per-node credential caching for an API gateway
//!
//! Caches credential lookups on the request path and keeps every node's
//! cache consistent with the entity store through cluster-wide invalidation.

pub mod api;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::{spawn_cleanup_task, spawn_invalidation_listener};
