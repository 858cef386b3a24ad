//! # Compile-Time Defaults
//!
//! Purpose: Centralize the constants the spec fixes at compile time so the
//! engine, the reader, and the server agree on them without plumbing.

/// Number of shards (arena blocks) the storage engine partitions keys into.
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// Per-shard arena capacity in bytes (8 MiB).
pub const DEFAULT_SHARD_CAPACITY: usize = 8 * 1024 * 1024;

/// Fixed capacity of one reader buffer node.
pub const NODE_CAPACITY: usize = 4096;

/// Fixed seed used for every key hash: shard routing, the index map, and the
/// eviction path's reverse lookup all must agree on this value.
pub const HASH_SEED: u64 = 0x1234_5678;

/// Default TCP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:6379";
