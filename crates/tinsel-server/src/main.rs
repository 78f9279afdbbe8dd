//! Tinsel server binary.
//!
//! Configuration comes from `TINSEL_*` environment variables (see
//! [`tinsel_server::config`]); log filtering from `RUST_LOG`.

use std::sync::Arc;

use tinsel_core::storage::MemoryStorage;
use tinsel_server::{ServerConfig, SystemEnv, serve};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tinsel=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "Starting tinsel");

    let service = Arc::new(config.build_service(SystemEnv, MemoryStorage::new()));
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    serve(listener, service).await?;
    Ok(())
}
