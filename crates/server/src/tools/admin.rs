//! Maintenance tools: doc_refresh, cache_clear.

use nodestore_core::DocumentClient;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the doc_refresh tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RefreshOutput {
    pub refreshed: bool,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Entries dropped from the cache.
    pub cleared: usize,
}

/// Implementation of the doc_refresh tool.
pub async fn refresh_impl(client: &DocumentClient) -> Result<CallToolResult, McpError> {
    client.refresh().await?;
    json_result(&RefreshOutput { refreshed: true })
}

/// Implementation of the cache_clear tool.
pub fn cache_clear_impl(client: &DocumentClient) -> Result<CallToolResult, McpError> {
    let cleared = client.cache().len();
    client.clear_cache();
    tracing::info!(cleared, "document cache cleared");
    json_result(&CacheClearOutput { cleared })
}
