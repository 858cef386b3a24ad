//! Accept loop: binds the listener, builds the engine and pools, and spawns
//! one task per connection.

use std::sync::Arc;

use tracing::{error, info};

use ringkv_engine::RingEngine;
use ringkv_reader::{NodePool, ReaderPool};
use ringkv_server::{handle_connection, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();
    let engine = Arc::new(RingEngine::with_shards(config.shard_count, config.shard_capacity));
    let node_pool = Arc::new(NodePool::new());
    let reader_pool = Arc::new(ReaderPool::new(node_pool));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, shards = config.shard_count, "ring-kv listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                error!(error = %err, "accept failed");
                continue;
            }
        };
        info!(%peer, "accepted connection");

        let engine = Arc::clone(&engine);
        let reader_pool = Arc::clone(&reader_pool);
        tokio::spawn(async move {
            handle_connection(stream, peer, engine, reader_pool).await;
        });
    }
}
