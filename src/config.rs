//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier of this gateway node, used to tag published invalidations
    pub node_id: String,
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL in seconds for cached credential snapshots
    pub default_ttl: u64,
    /// TTL in seconds for cached "unknown credential" results
    pub negative_ttl: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Upper bound on a single persistent-store lookup, in milliseconds
    pub load_timeout_ms: u64,
    /// Base URLs of the other nodes in the cluster
    pub peers: Vec<String>,
    /// Per-attempt timeout when delivering to a peer, in milliseconds
    pub propagation_timeout_ms: u64,
    /// Number of delivery attempts per peer before giving up
    pub propagation_attempts: u32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NODE_ID` - Node identifier (default: random UUID)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `DEFAULT_TTL` - Snapshot TTL in seconds (default: 300)
    /// - `NEGATIVE_TTL` - Negative entry TTL in seconds (default: 30)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `LOAD_TIMEOUT_MS` - Store lookup timeout (default: 2000)
    /// - `PEERS` - Comma separated peer base URLs (default: none)
    /// - `PROPAGATION_TIMEOUT_MS` - Peer delivery timeout (default: 500)
    /// - `PROPAGATION_ATTEMPTS` - Peer delivery attempts (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node_id: env::var("NODE_ID").unwrap_or(defaults.node_id),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            negative_ttl: parse_var("NEGATIVE_TTL").unwrap_or(defaults.negative_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            load_timeout_ms: parse_var("LOAD_TIMEOUT_MS").unwrap_or(defaults.load_timeout_ms),
            peers: env::var("PEERS")
                .map(|v| parse_peers(&v))
                .unwrap_or(defaults.peers),
            propagation_timeout_ms: parse_var("PROPAGATION_TIMEOUT_MS")
                .unwrap_or(defaults.propagation_timeout_ms),
            propagation_attempts: parse_var("PROPAGATION_ATTEMPTS")
                .unwrap_or(defaults.propagation_attempts),
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn propagation_timeout(&self) -> Duration {
        Duration::from_millis(self.propagation_timeout_ms)
    }

    /// How long invalidation tombstones are kept.
    ///
    /// Must outlive any read-through load. A load is bounded by the load
    /// timeout as a whole, so twice that leaves a full timeout of margin.
    pub fn tombstone_retention(&self) -> Duration {
        self.load_timeout() * 2
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: uuid::Uuid::new_v4().to_string(),
            server_port: 3000,
            max_entries: 10_000,
            default_ttl: 300,
            negative_ttl: 30,
            cleanup_interval: 1,
            load_timeout_ms: 2_000,
            peers: Vec::new(),
            propagation_timeout_ms: 500,
            propagation_attempts: 3,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
