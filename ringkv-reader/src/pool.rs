//! # Node Pool
//!
//! Purpose: A process-wide free list of buffer nodes, safe for concurrent
//! acquire/release across connection tasks. Reset-on-return keeps a
//! dequeued node's bookkeeping zeroed; its byte contents are considered
//! uninitialized until the next fill.
//!
//! Nodes are tracked as `Arc<Node>` rather than a uniquely owned `Box`: a
//! zero-copy `ReadSlice::Borrowed` holds its own clone, so a node can only
//! be handed back into circulation for a *different* connection to reuse
//! once every such clone has been dropped.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::node::Node;

/// Concurrent free list of reusable buffer nodes.
pub struct NodePool {
    free: Mutex<Vec<Arc<Node>>>,
}

impl NodePool {
    /// Creates an empty pool; nodes are allocated lazily on first demand.
    pub fn new() -> Self {
        NodePool {
            free: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self) -> Arc<Node> {
        self.free.lock().pop().unwrap_or_else(|| Arc::new(Node::new()))
    }

    /// Returns `node` to the free list, but only if no outstanding
    /// `ReadSlice::Borrowed` still holds a clone of it. If one does, this
    /// drops the pool's own reference and leaves the node out of
    /// circulation: its memory is freed once the last slice clone drops
    /// rather than being handed to some other connection's reader while
    /// still aliased.
    pub(crate) fn release(&self, node: Arc<Node>) {
        if let Ok(node) = Arc::try_unwrap(node) {
            self.free.lock().push(Arc::new(node));
        }
    }

    /// Number of nodes currently idle in the pool. Exposed for tests and
    /// diagnostics; not part of the hot path.
    pub fn idle_count(&self) -> usize {
        self.free.lock().len()
    }
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new()
    }
}
