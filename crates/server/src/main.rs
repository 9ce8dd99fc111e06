//! sleuth-mcp server entry point.
//!
//! Boots the MCP server on stdio transport. Logging goes to stderr so stdout
//! stays reserved for JSON-RPC.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use sleuth_core::{AppConfig, CacheDb};
use sleuth_engine::Orchestrator;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;

    match db.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "removed expired cache entries"),
        Err(e) => tracing::warn!(error = %e, "startup purge failed"),
    }

    tracing::info!(db_path = %config.db_path.display(), "starting sleuth-mcp on stdio transport");

    let orchestrator = Arc::new(Orchestrator::from_config(&config, db));
    let handler = handler::SleuthServer::new(orchestrator);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
