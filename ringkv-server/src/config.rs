//! # Runtime Configuration
//!
//! Compile-time defaults live as `const`s in `ringkv_common`; this module
//! resolves the small set of environment overrides operators may want
//! without reaching for a config file the spec never asked for.

use ringkv_common::{DEFAULT_LISTEN_ADDR, DEFAULT_SHARD_CAPACITY, DEFAULT_SHARD_COUNT};

/// Resolved server configuration: compiled defaults unless overridden by
/// environment variables.
pub struct ServerConfig {
    pub listen_addr: String,
    pub shard_count: usize,
    pub shard_capacity: usize,
}

impl ServerConfig {
    /// Reads `RINGKV_ADDR`, `RINGKV_SHARDS`, `RINGKV_SHARD_CAPACITY` from
    /// the environment, falling back to the compiled defaults on absence
    /// or malformed values.
    pub fn from_env() -> Self {
        ServerConfig {
            listen_addr: std::env::var("RINGKV_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            shard_count: parse_env_or("RINGKV_SHARDS", DEFAULT_SHARD_COUNT),
            shard_capacity: parse_env_or("RINGKV_SHARD_CAPACITY", DEFAULT_SHARD_CAPACITY),
        }
    }
}

fn parse_env_or(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
