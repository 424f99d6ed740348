//! swcache server entry point.
//!
//! Loads configuration, opens the response store and boots the MCP server on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchConfig, HttpFetcher};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let storage = CacheDb::open(&config.db_path)
        .await?
        .with_max_entries(config.max_entries_per_generation);
    let network = HttpFetcher::new(FetchConfig::from(&config))?;

    tracing::info!(
        db = %config.db_path.display(),
        origin = %config.origin,
        cache_name = %config.cache_name,
        "Starting swcache server on stdio transport"
    );

    let service = state::CacheService::new(config, Arc::new(storage), Arc::new(network));
    let handler = handler::SwCacheServer::new(service);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
