//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    admin::{cache_clear_impl, refresh_impl},
    read::{GetParams, MultiGetParams, exists_impl, get_impl, multi_get_impl},
    search::{CountParams, MultiSearchParams, SearchParams, count_impl, multi_search_impl, search_impl},
    write::{DeleteParams, IndexParams, PartialUpdateParams, UpdateParams, delete_impl, index_impl, partial_update_impl, update_impl},
};

use nodestore_core::DocumentClient;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for nodestore.
#[derive(Clone)]
pub struct NodeStoreServer {
    tool_router: ToolRouter<Self>,
    client: DocumentClient,
    default_index: String,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl NodeStoreServer {
    /// Create a new server handler over `client`.
    ///
    /// Tools that name no index use `default_index`.
    pub fn new(client: DocumentClient, default_index: impl Into<String>) -> Self {
        Self { tool_router: Self::tool_router(), client, default_index: default_index.into() }
    }

    #[tool(description = "Index a document under an id, replacing any stored document. The document is cached.")]
    async fn doc_index(&self, params: Parameters<IndexParams>) -> Result<CallToolResult, McpError> {
        index_impl(&self.client, &self.default_index, params.0).await
    }

    /// Replace a document by delete-then-reindex.
    ///
    /// With `check_version`, the stored `_ver` must not be newer than the
    /// candidate's; a conflict error carries the stored document.
    #[tool(
        description = "Replace a document. With check_version=true the write is rejected if the stored _ver is newer; the error data carries the stored document."
    )]
    async fn doc_update(&self, params: Parameters<UpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Apply a partial update script (e.g. {\"doc\": {...}}) to a stored document.")]
    async fn doc_partial_update(&self, params: Parameters<PartialUpdateParams>) -> Result<CallToolResult, McpError> {
        partial_update_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Delete a document by id.")]
    async fn doc_delete(&self, params: Parameters<DeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Fetch a document by id. Recently indexed documents are served from the cache.")]
    async fn doc_get(&self, params: Parameters<GetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Check whether a document exists. Backend failures report exists=false with an error message.")]
    async fn doc_exists(&self, params: Parameters<GetParams>) -> Result<CallToolResult, McpError> {
        exists_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(
        description = "Fetch several documents by id in one request. Missing ids are omitted unless aligned=true, which returns one slot per id."
    )]
    async fn doc_multi_get(&self, params: Parameters<MultiGetParams>) -> Result<CallToolResult, McpError> {
        multi_get_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Run a JSON query and return hit sources. first_only=true returns at most one hit.")]
    async fn doc_search(&self, params: Parameters<SearchParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Run several JSON queries in one request and return all hit sources flattened. Failed queries are skipped.")]
    async fn doc_multi_search(&self, params: Parameters<MultiSearchParams>) -> Result<CallToolResult, McpError> {
        multi_search_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Count documents matching a JSON query. Backend failures report count=-1 with an error message.")]
    async fn doc_count(&self, params: Parameters<CountParams>) -> Result<CallToolResult, McpError> {
        count_impl(&self.client, &self.default_index, params.0).await
    }

    #[tool(description = "Refresh all indices so recent writes become searchable.")]
    async fn doc_refresh(&self) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.client).await
    }

    #[tool(description = "Drop every entry from the client-side document cache.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        cache_clear_impl(&self.client)
    }
}

impl ServerHandler for NodeStoreServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "nodestore".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
