//! nodestore-mcp server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use nodestore_client::ElasticBackend;
use nodestore_core::{AppConfig, DocumentClient, LruDocumentCache, provision};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
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

    let config = AppConfig::load()?;
    tracing::info!(nodes = ?config.nodes, default_index = %config.default_index, "Starting nodestore-mcp on stdio transport");

    let backend = Arc::new(ElasticBackend::from_app_config(&config)?);

    let created = provision::ensure_indices(backend.as_ref(), &config).await?;
    if !created.is_empty() {
        tracing::info!(?created, "provisioned indices");
    }

    let cache = Arc::new(LruDocumentCache::new(config.cache_capacity));
    let client = DocumentClient::new(backend, cache);

    let handler = handler::NodeStoreServer::new(client, config.default_index.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
