//! # Zero-Copy Reader
//!
//! Purpose: Feed bytes straight from the socket into pooled nodes and hand
//! parsed slices back to the protocol layer without an intermediate copy,
//! except where a request straddles a node boundary.
//!
//! ## Design Principles
//!
//! 1. **Node Chain, Not a Growable Buffer**: Bytes live in fixed 4 KiB nodes
//!    chained from `rNode` (the read head) to `wNode` (the write tail); only
//!    the tail's write cursor ever advances from a socket read.
//! 2. **Deferred Release, Refcounted**: A fully-consumed node moves to a
//!    garbage list, not straight back to the pool -- the protocol layer may
//!    still hold a zero-copy slice into it until it calls `collect_garbage`.
//!    That slice holds its own `Arc<Node>` clone, so even a caller that
//!    retains it past `collect_garbage` keeps the node alive; the node
//!    pool only recycles a node for a *different* connection once every
//!    clone has dropped (see `pool::NodePool::release`).
//! 3. **Single-Threaded**: Exactly one task owns a reader; there is no
//!    internal locking here, only at the shared node pool's acquire/release.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use ringkv_common::NODE_CAPACITY;

use crate::node::Node;
use crate::pool::NodePool;

/// A slice returned by [`Reader::read`]: either a zero-copy view into a node
/// still owned by the reader, or an owned copy when the request straddled a
/// node boundary.
pub enum ReadSlice {
    /// Zero-copy view into a node, identified by an `Arc<Node>` clone plus
    /// the `[start, start + len)` range within it. The `Arc` clone -- not a
    /// borrowed lifetime -- is what keeps the bytes valid for as long as
    /// this value is alive, even across a `collect_garbage` call on the
    /// `Reader` that produced it.
    Borrowed { node: Arc<Node>, start: usize, len: usize },
    /// Owned copy, taken when the requested span crossed a node boundary.
    Owned(Vec<u8>),
}

impl std::ops::Deref for ReadSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ReadSlice::Borrowed { node, start, len } => {
                // SAFETY: `node` is our own `Arc` clone, so the buffer it
                // points at is guaranteed live for as long as this
                // `ReadSlice` exists. `[*start, *start + *len)` was carved
                // out of the node's already-written prefix at the moment
                // `Reader::read` issued this slice and no later `fill` call
                // can touch that range (see `node::Node`'s doc comment).
                unsafe { std::slice::from_raw_parts(node.as_ptr().add(*start), *len) }
            }
            ReadSlice::Owned(buf) => buf,
        }
    }
}

/// One node in the reader's active chain, paired with the read/write
/// cursors the reader tracks for it. The cursors live here rather than on
/// `Node` itself so that cloning the node's `Arc` out for a `ReadSlice`
/// never needs mutable access to the `Arc`'s payload.
struct ActiveNode {
    node: Arc<Node>,
    read_offset: usize,
    write_offset: usize,
}

/// Per-connection zero-copy buffer reader, generic over the socket type so
/// tests can drive it with an in-memory duplex stream instead of a real TCP
/// socket.
pub struct Reader<S> {
    conn: Option<S>,
    /// Active node chain, front = rNode (read head), back = wNode (write
    /// tail). A `VecDeque` gives O(1) push-to-tail and pop-from-head without
    /// hand-rolled pointer chasing.
    active: VecDeque<ActiveNode>,
    /// Consumed nodes that may still back an outstanding `ReadSlice`.
    garbage: Vec<Arc<Node>>,
    /// Total unread bytes across every node from rNode to wNode.
    remain: usize,
    node_pool: Arc<NodePool>,
}

impl<S> Reader<S> {
    pub(crate) fn empty(node_pool: Arc<NodePool>) -> Box<Reader<S>> {
        Box::new(Reader {
            conn: None,
            active: VecDeque::new(),
            garbage: Vec::new(),
            remain: 0,
            node_pool,
        })
    }

    /// Binds the reader to a freshly accepted connection, guaranteeing a
    /// write node is ready to receive socket bytes.
    pub(crate) fn bind(&mut self, conn: S) {
        self.conn = Some(conn);
        if self.active.is_empty() {
            self.active.push_back(ActiveNode {
                node: self.node_pool.acquire(),
                read_offset: 0,
                write_offset: 0,
            });
        }
    }

    /// Drops the socket handle and moves every node -- active and garbage --
    /// back to the pool. Leaves the reader ready to be pushed onto the
    /// reader pool's free list.
    pub(crate) fn teardown(&mut self) {
        self.conn = None;
        self.remain = 0;
        for active in self.active.drain(..) {
            self.garbage.push(active.node);
        }
        self.collect_garbage();
    }

    /// Releases every garbage node back to the node pool. Any
    /// `ReadSlice::Borrowed` handed out since the last call stays valid
    /// regardless (it owns its own `Arc` clone); this only makes the node
    /// available for a *different* connection to reuse, and only once no
    /// such clone remains (see `NodePool::release`).
    pub fn collect_garbage(&mut self) {
        for node in self.garbage.drain(..) {
            self.node_pool.release(node);
        }
    }

    fn retire_front(&mut self) {
        if let Some(active) = self.active.pop_front() {
            self.garbage.push(active.node);
        }
    }
}

impl<S: AsyncRead + Unpin> Reader<S> {
    /// Pulls more bytes from the socket. Allocates a fresh tail node first if
    /// the current one is full, then issues one socket read into its
    /// remaining capacity. Errors (including EOF) propagate verbatim.
    async fn fill(&mut self) -> io::Result<()> {
        let needs_new_tail = self
            .active
            .back()
            .map_or(true, |node| node.write_offset == NODE_CAPACITY);
        if needs_new_tail {
            self.active.push_back(ActiveNode {
                node: self.node_pool.acquire(),
                read_offset: 0,
                write_offset: 0,
            });
        }

        let conn = self.conn.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "reader is not bound to a connection")
        })?;
        let tail = self.active.back_mut().expect("fill always ensures a tail node");
        let buf = tail.node.buf();
        let n = conn.read(&mut buf[tail.write_offset..]).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"));
        }
        tail.write_offset += n;
        self.remain += n;
        Ok(())
    }

    /// Returns the next byte, pulling from the socket as needed.
    pub async fn read_byte(&mut self) -> io::Result<u8> {
        while self.remain < 1 {
            self.fill().await?;
        }

        if self
            .active
            .front()
            .map_or(false, |node| node.read_offset == node.write_offset)
        {
            self.retire_front();
        }

        let node = self.active.front_mut().expect("fill guarantees data is available");
        let byte = node.node.buf()[node.read_offset];
        node.read_offset += 1;
        self.remain -= 1;
        Ok(byte)
    }

    /// Returns exactly `n` bytes. If they lie inside one node, the result
    /// borrows that node's buffer with no copy; if they straddle a node
    /// boundary, the result is a freshly allocated copy.
    ///
    /// The borrowed case loops `fill` until enough bytes are buffered (this
    /// is the intended behavior; an earlier single-fill-then-return version
    /// was a defect, see workspace design notes).
    pub async fn read(&mut self, n: usize) -> io::Result<ReadSlice> {
        if n == 0 {
            return Ok(ReadSlice::Owned(Vec::new()));
        }

        while self.remain < n {
            self.fill().await?;
        }
        self.remain -= n;

        if self
            .active
            .front()
            .map_or(false, |node| node.read_offset == node.write_offset)
        {
            self.retire_front();
        }

        let head_avail = {
            let node = self.active.front().expect("fill guarantees data is available");
            node.write_offset - node.read_offset
        };

        if head_avail >= n {
            let node = self.active.front_mut().expect("checked above");
            let start = node.read_offset;
            node.read_offset += n;

            return Ok(ReadSlice::Borrowed {
                node: Arc::clone(&node.node),
                start,
                len: n,
            });
        }

        let mut buf = Vec::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let node = self
                .active
                .front_mut()
                .expect("fill guarantees enough total data is buffered");
            let avail = node.write_offset - node.read_offset;
            let take = avail.min(remaining);
            let src = &node.node.buf()[node.read_offset..node.read_offset + take];
            buf.extend_from_slice(src);
            node.read_offset += take;
            remaining -= take;

            if node.read_offset == node.write_offset && remaining > 0 {
                self.retire_front();
            }
        }
        Ok(ReadSlice::Owned(buf))
    }
}
