//! # Error Kinds
//!
//! Purpose: Give the engine and reader a small, typed error surface so the
//! server layer can decide reply vs. teardown without string matching.

use thiserror::Error;

/// Errors produced by the storage engine and the wire layer built on it.
#[derive(Debug, Error)]
pub enum RingKvError {
    /// Lookup missed, or the record backing it had already expired.
    #[error("not found")]
    NotFound,

    /// Socket I/O failed; the connection should be torn down.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RESP framing or an unsupported command shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result alias used throughout the engine and reader crates.
pub type RingKvResult<T> = Result<T, RingKvError>;
