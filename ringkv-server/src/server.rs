//! # Connection Handler
//!
//! One task per accepted connection: reads commands through the zero-copy
//! reader, dispatches them against the shared engine, and writes replies
//! back. Mirrors the teacher's `handle_connection` / `dispatch_command`
//! split, generalized onto the pooled reader instead of a growable
//! `BytesMut`.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, warn};

use ringkv_common::RingKvError;
use ringkv_engine::RingEngine;
use ringkv_reader::ReaderPool;

use crate::protocol::{dispatch_command, read_command};

/// Handles a single TCP client connection end to end, including reader
/// acquire/release against the shared pool.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: std::net::SocketAddr,
    engine: Arc<RingEngine>,
    reader_pool: Arc<ReaderPool<tokio::net::tcp::OwnedReadHalf>>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = reader_pool.acquire(read_half);

    loop {
        match read_command(&mut reader).await {
            Ok(args) => {
                let response = dispatch_command(&args, engine.as_ref());
                if let Err(err) = write_half.write_all(&response).await {
                    warn!(%peer, error = %err, "failed writing reply, closing connection");
                    break;
                }
                reader.collect_garbage();
            }
            Err(RingKvError::Io(io_err)) if io_err.kind() == std::io::ErrorKind::UnexpectedEof => {
                info!(%peer, "connection closed by peer");
                break;
            }
            Err(err) => {
                warn!(%peer, error = %err, "protocol error, closing connection");
                let _ = write_half
                    .write_all(format!("-ERR protocol error '{err}'\r\n").as_bytes())
                    .await;
                break;
            }
        }
    }

    reader_pool.release(reader);
}
