//! # Storage Engine
//!
//! Purpose: Route keys to shards by hash and expose `Set`/`Get`/`Delete` as a
//! stateless façade. The engine owns all shards for the process lifetime and
//! never exposes shard identity to callers.
//!
//! ## Design Principles
//!
//! 1. **Strategy Pattern**: `KvEngine` lets the server depend on a trait
//!    object rather than the concrete sharded implementation.
//! 2. **N-Way Parallelism**: Each shard serializes only its own operations;
//!    there is no engine-wide lock and no ordering guarantee across shards.

use ringkv_common::{hash_key, DEFAULT_SHARD_CAPACITY, DEFAULT_SHARD_COUNT};

use crate::shard::Shard;

/// Storage engine contract. The server dispatches commands against this
/// trait so the wire layer never depends on the concrete shard layout.
pub trait KvEngine: Send + Sync {
    /// Inserts or overwrites `key` with `value`. `expire_seconds == 0` means
    /// the record never expires.
    fn set(&self, key: &[u8], value: &[u8], expire_seconds: u64);

    /// Looks up `key`, returning an owned copy of the value on a hit.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Removes `key`, returning whether a live record existed.
    fn delete(&self, key: &[u8]) -> bool;
}

/// Sharded ring-buffer storage engine: a fixed vector of independently
/// locked arena blocks, selected by `hash(key) mod shard_count`.
pub struct RingEngine {
    shards: Vec<Shard>,
}

impl RingEngine {
    /// Builds an engine with the spec's compile-time defaults (256 shards,
    /// 8 MiB per shard).
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT, DEFAULT_SHARD_CAPACITY)
    }

    /// Builds an engine with an explicit shard count and per-shard capacity.
    ///
    /// Tests that want to exercise eviction quickly construct small arenas
    /// this way rather than waiting out the 8 MiB default.
    pub fn with_shards(shard_count: usize, shard_capacity: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count).map(|_| Shard::new(shard_capacity)).collect();
        RingEngine { shards }
    }

    fn shard_for(&self, key: &[u8]) -> &Shard {
        let index = (hash_key(key) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

impl Default for RingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KvEngine for RingEngine {
    fn set(&self, key: &[u8], value: &[u8], expire_seconds: u64) {
        self.shard_for(key).set(key, value, expire_seconds);
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.shard_for(key).get(key)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.shard_for(key).delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_get_roundtrip_across_shards() {
        let engine = RingEngine::with_shards(8, 4096);
        for i in 0..32u32 {
            let key = format!("key{i}");
            engine.set(key.as_bytes(), key.as_bytes(), 0);
        }
        for i in 0..32u32 {
            let key = format!("key{i}");
            assert_eq!(engine.get(key.as_bytes()).as_deref(), Some(key.as_bytes()));
        }
    }

    #[test]
    fn delete_idempotence() {
        let engine = RingEngine::with_shards(4, 4096);
        engine.set(b"k", b"v", 0);
        assert!(engine.delete(b"k"));
        assert!(engine.get(b"k").is_none());
        assert!(!engine.delete(b"k"));
    }

    #[test]
    fn concurrent_sets_on_different_shards_do_not_block_each_other() {
        let engine = Arc::new(RingEngine::with_shards(16, 1 << 16));
        let mut handles = Vec::new();
        for t in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for i in 0..200u32 {
                    let key = format!("t{t}-{i}");
                    engine.set(key.as_bytes(), key.as_bytes(), 0);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for t in 0..8 {
            for i in 0..200u32 {
                let key = format!("t{t}-{i}");
                assert_eq!(engine.get(key.as_bytes()).as_deref(), Some(key.as_bytes()));
            }
        }
    }
}
