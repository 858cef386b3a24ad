//! ringkv-common - Shared types, error kinds, and wire constants for ring-kv
//!
//! This crate is the dependency-free leaf of the workspace: the engine, the
//! reader, and the server all depend on it, never the other way around.

pub mod config;
pub mod error;
pub mod hash;

pub use config::*;
pub use error::{RingKvError, RingKvResult};
pub use hash::hash_key;
