//! # Arena Block (Shard)
//!
//! Purpose: One fixed-capacity byte arena plus a hash-to-offset index. Records
//! are appended monotonically at the write head; space is reclaimed only by
//! walking the far end of the reservation one record at a time (FIFO).
//!
//! ## Design Principles
//!
//! 1. **Append-Only Writes**: `set` never rewrites live bytes; it only
//!    advances the write head and, when short on room, evicts from the tail
//!    of the reservation.
//! 2. **Hash-Only Index**: `index` maps a 64-bit hash to an offset; the
//!    stored key is re-checked on every read/delete so a hash collision
//!    between two live keys can never return the wrong value, though it can
//!    orphan the older entry (see module docs on `RingEngine`).
//! 3. **Positional Eviction**: The arena is a bounded ring; the "oldest
//!    record" boundary is implicit in `offset`/`remain`, not a pointer.
//!
//! ## Record Layout
//!
//! ```text
//! [key_len u32][value_len u32][expire_at_unix_secs u64][key bytes][value bytes]
//! ```
//!
//! A `key_len` of zero at a position means "no record starts here" -- either
//! a tombstoned record or the unused tail past the write head -- and is the
//! walk terminator `evict` looks for.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use ringkv_common::hash_key;

/// Size in bytes of the fixed record header (key_len, value_len, expire_at).
const HEADER_LEN: usize = 4 + 4 + 8;

/// One shard: a fixed-capacity arena, its hash index, and the lock guarding
/// both. Shards are the engine's unit of parallelism -- every operation on a
/// shard holds only that shard's lock.
pub struct Shard {
    inner: RwLock<ShardInner>,
}

struct ShardInner {
    /// Fixed-capacity byte arena holding packed records.
    data: Box<[u8]>,
    /// Hash -> offset of the record's header start in `data`.
    index: HashMap<u64, usize>,
    /// Write head: where the next record will be written.
    offset: usize,
    /// Bytes reserved ahead of the write head for not-yet-evicted records.
    remain: usize,
}

impl Shard {
    /// Creates an empty shard with the given arena capacity.
    pub fn new(capacity: usize) -> Self {
        Shard {
            inner: RwLock::new(ShardInner {
                data: vec![0u8; capacity].into_boxed_slice(),
                index: HashMap::new(),
                offset: 0,
                remain: 0,
            }),
        }
    }

    /// Inserts or overwrites `key` with `value`. `expire_seconds == 0` means
    /// no expiration; otherwise the record expires `expire_seconds` from now.
    ///
    /// Evicts from the tail of the reservation until the record fits, then
    /// appends it at the write head and advances past it.
    pub fn set(&self, key: &[u8], value: &[u8], expire_seconds: u64) {
        let expire_at = if expire_seconds == 0 {
            0
        } else {
            now_unix_secs() + expire_seconds
        };

        let record_len = HEADER_LEN + key.len() + value.len();
        let hash = hash_key(key);

        let mut inner = self.inner.write();
        while inner.remain <= record_len {
            evict_one(&mut inner);
        }

        let offset = inner.offset;
        write_record(&mut inner.data, offset, key, value, expire_at);
        inner.index.insert(hash, offset);
        inner.offset += record_len;
        inner.remain -= record_len;
    }

    /// Looks up `key`, returning an owned copy of the value bytes.
    ///
    /// Returns `None` on a missed lookup, a hash-collision mismatch (the
    /// stored key at that offset differs from `key`), or an expired record.
    /// The byte copy happens while the shard's lock is held, so the returned
    /// buffer stays valid independent of any later mutation on the shard.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let hash = hash_key(key);
        let inner = self.inner.read();

        let offset = *inner.index.get(&hash)?;
        let record = read_record(&inner.data, offset)?;
        if record.key != key {
            return None;
        }
        if record.expire_at != 0 && record.expire_at < now_unix_secs() {
            return None;
        }
        Some(record.value.to_vec())
    }

    /// Removes `key`, returning whether a live (non-expired) record existed.
    ///
    /// The index entry is removed whenever the stored key matches, even if
    /// the record had already expired -- only the return value distinguishes
    /// the two cases, matching wire-level semantics where both report "miss".
    pub fn delete(&self, key: &[u8]) -> bool {
        let hash = hash_key(key);
        let mut inner = self.inner.write();

        let offset = match inner.index.get(&hash).copied() {
            Some(offset) => offset,
            None => return false,
        };

        let record = match read_record(&inner.data, offset) {
            Some(record) => record,
            None => return false,
        };
        if record.key != key {
            return false;
        }
        let expired = record.expire_at != 0 && record.expire_at < now_unix_secs();

        inner.index.remove(&hash);
        !expired
    }
}

/// A view onto one decoded record's fields, borrowed from the arena.
struct RecordView<'a> {
    expire_at: u64,
    key: &'a [u8],
    value: &'a [u8],
}

/// Decodes the record header and key/value slices at `offset`.
///
/// Returns `None` if `key_len` is zero (no record starts here).
fn read_record(data: &[u8], offset: usize) -> Option<RecordView<'_>> {
    let key_len = read_u32(data, offset) as usize;
    if key_len == 0 {
        return None;
    }
    let value_len = read_u32(data, offset + 4) as usize;
    let expire_at = read_u64(data, offset + 8);

    let key_start = offset + HEADER_LEN;
    let value_start = key_start + key_len;
    Some(RecordView {
        expire_at,
        key: &data[key_start..key_start + key_len],
        value: &data[value_start..value_start + value_len],
    })
}

/// Serializes a record's header, key, and value at `offset`.
fn write_record(data: &mut [u8], offset: usize, key: &[u8], value: &[u8], expire_at: u64) {
    write_u32(data, offset, key.len() as u32);
    write_u32(data, offset + 4, value.len() as u32);
    write_u64(data, offset + 8, expire_at);

    let key_start = offset + HEADER_LEN;
    let value_start = key_start + key.len();
    data[key_start..value_start].copy_from_slice(key);
    data[value_start..value_start + value.len()].copy_from_slice(value);
}

/// Stamps a zero `key_len` at `offset`, marking the slot as gone.
fn tombstone(data: &mut [u8], offset: usize) {
    write_u32(data, offset, 0);
}

/// Reclaims space from the far end of the write head's reservation.
///
/// A single call frees at most one record, or performs one end-of-buffer
/// wrap; callers loop until enough space exists. See module docs for the
/// positional-FIFO rationale.
fn evict_one(inner: &mut ShardInner) {
    let mut pos = inner.offset + inner.remain;

    // Not enough room left at the tail of the buffer for even a header:
    // give up the remainder, tombstone the write head, and wrap to the start.
    if pos + HEADER_LEN > inner.data.len() {
        tombstone(&mut inner.data, inner.offset);
        inner.offset = 0;
        inner.remain = 0;
        pos = 0;
    }

    let key_len = read_u32(&inner.data, pos) as usize;
    if key_len == 0 {
        // Nothing between here and the end of the buffer is live; the rest
        // of the tail is immediately available for new writes.
        inner.remain = inner.data.len() - inner.offset;
        return;
    }

    let value_len = read_u32(&inner.data, pos + 4) as usize;
    let record_len = HEADER_LEN + key_len + value_len;
    inner.remain += record_len;
    tombstone(&mut inner.data, pos);

    let key_start = pos + HEADER_LEN;
    let hash = hash_key(&inner.data[key_start..key_start + key_len]);
    if inner.index.get(&hash) == Some(&pos) {
        inner.index.remove(&hash);
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap())
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
