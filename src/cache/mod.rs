//! Cache Module
//!
//! Per-node credential cache: key derivation, TTL-bounded storage and
//! invalidation fences.

mod entry;
pub mod keys;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use keys::{credential_key, derive_key, parse_key};
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup, DEFAULT_TOMBSTONE_RETENTION};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
