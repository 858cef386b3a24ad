//! # Key Hashing
//!
//! Purpose: One fixed-seed 64-bit hash, shared by shard routing, the index
//! map, and the eviction path's reverse lookup (engine `set`/`get`/`delete`
//! and `evict` must all land on the same shard for the same key).

use crate::config::HASH_SEED;

/// Hashes `key` with the workspace-wide fixed seed.
///
/// xxh3 is a high-quality non-cryptographic hash; the seed is fixed so the
/// same key always lands on the same shard and the same index slot across
/// the process lifetime.
#[inline]
pub fn hash_key(key: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_seed(key, HASH_SEED)
}
