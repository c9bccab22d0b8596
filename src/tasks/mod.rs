//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a node.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries and stale tombstones at configured intervals
//! - Invalidation Listener: Applies invalidations published by other nodes

mod cleanup;
mod listener;

pub use cleanup::spawn_cleanup_task;
pub use listener::spawn_invalidation_listener;
