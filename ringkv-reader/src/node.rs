//! # Buffer Node
//!
//! Purpose: One fixed-capacity byte node fed directly by socket reads. A
//! node's byte storage is reference-counted (`Arc<Node>`), not uniquely
//! owned by the reader's chain: a zero-copy `ReadSlice::Borrowed` holds its
//! own clone of that `Arc`, which is what keeps the backing bytes alive for
//! as long as the slice is held -- including past a `collect_garbage` call
//! a caller forgot to respect. Read/write cursors live outside `Node`, in
//! the reader's own per-node bookkeeping, so cloning the `Arc` out for a
//! slice never contends with advancing them.

use std::cell::UnsafeCell;

use ringkv_common::NODE_CAPACITY;

/// A node's fixed byte storage. `fill` appends new socket bytes through a
/// shared `&Node` even while an earlier `ReadSlice::Borrowed` still holds
/// its own clone of the same `Arc<Node>` -- `UnsafeCell` is what makes that
/// legal to express. It's sound because every slice is bounded by the
/// node's `write_offset` at the moment it was issued, and `fill` only ever
/// writes into `[write_offset, NODE_CAPACITY)`: the ranges a `fill` call
/// can touch and the ranges any outstanding slice can read never overlap.
pub(crate) struct Node {
    data: UnsafeCell<[u8; NODE_CAPACITY]>,
}

// SAFETY: a `Node` is only ever driven by the single task that owns its
// `Reader`; no instance is genuinely accessed from two threads at once.
// `Sync` is required purely so `Arc<Node>` can be carried across the
// `.await` points in `Reader`'s async methods (which require their stored
// state to be `Send`), not because concurrent access is actually supported.
// The module-level doc comment is the soundness argument for the
// UnsafeCell itself: writer and readers never touch overlapping bytes.
unsafe impl Sync for Node {}

impl Node {
    pub(crate) fn new() -> Node {
        Node {
            data: UnsafeCell::new([0u8; NODE_CAPACITY]),
        }
    }

    /// Raw pointer to the start of the node's buffer, used to build a
    /// zero-copy `ReadSlice`. Callers must only read `[start, start + len)`
    /// ranges that were carved out while holding `&mut` access to the
    /// owning `ActiveNode`, per the module doc's disjoint-range argument.
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.data.get() as *const u8
    }

    /// Mutable view of the full buffer, for `fill` to write socket bytes
    /// into and for the reader to read already-written bytes out of. Both
    /// uses are gated by the reader's own `read_offset`/`write_offset`
    /// bookkeeping, never by anything tracked on `Node` itself.
    pub(crate) fn buf(&self) -> &mut [u8; NODE_CAPACITY] {
        // SAFETY: see the struct and impl docs above.
        unsafe { &mut *self.data.get() }
    }
}
