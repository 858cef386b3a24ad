//! ringkv-reader - Zero-copy, pooled connection buffering
//!
//! Each accepted connection gets a `Reader` drawn from a `ReaderPool`; the
//! reader pulls socket bytes into fixed nodes drawn from a shared `NodePool`
//! and hands the protocol layer slices that borrow those nodes directly
//! whenever a request doesn't straddle a node boundary. Nodes return to the
//! pool only after the caller calls `collect_garbage`, once it is done with
//! any slice it was handed.

mod node;
pub mod pool;
pub mod reader;

pub use pool::NodePool;
pub use reader::{ReadSlice, Reader};

use std::sync::Arc;

use parking_lot::Mutex;

/// Process-wide free list of `Reader`s, mirroring `NodePool`'s reset-on-return
/// contract one level up: a reader released back to the pool has already
/// returned its nodes and dropped its socket handle.
pub struct ReaderPool<S> {
    free: Mutex<Vec<Box<Reader<S>>>>,
    node_pool: Arc<NodePool>,
}

impl<S> ReaderPool<S> {
    pub fn new(node_pool: Arc<NodePool>) -> Self {
        ReaderPool {
            free: Mutex::new(Vec::new()),
            node_pool,
        }
    }

    /// Draws a reader from the pool (or builds one) and binds it to `conn`.
    pub fn acquire(&self, conn: S) -> Box<Reader<S>> {
        let mut reader = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Reader::empty(Arc::clone(&self.node_pool)));
        reader.bind(conn);
        reader
    }

    /// Tears the reader down (dropping its connection, releasing its nodes)
    /// and returns it to the free list.
    pub fn release(&self, mut reader: Box<Reader<S>>) {
        reader.teardown();
        self.free.lock().push(reader);
    }
}
