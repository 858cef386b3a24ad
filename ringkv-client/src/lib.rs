//! ringkv-client - Blocking, connection-pooled RESP2 client
//!
//! A small synchronous client used by the benchmark driver and by
//! integration tests as a wire-level harness.

mod client;
mod pool;
mod resp;

pub use client::{ClientConfig, ClientError, ClientResult, KvClient};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use resp::{encode_command, read_response, RespValue};
