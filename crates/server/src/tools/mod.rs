//! MCP tool implementations.
//!
//! This module contains all tools exposed by the nodestore server. Each tool
//! is a params struct, an output struct and an `*_impl` function taking the
//! shared [`DocumentClient`](nodestore_core::DocumentClient).

pub mod admin;
pub mod read;
pub mod search;
pub mod write;

use nodestore_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Index named by the call, or the configured default.
pub(crate) fn resolve_index<'a>(requested: &'a Option<String>, default_index: &'a str) -> Result<&'a str, McpError> {
    match requested.as_deref().map(str::trim) {
        Some("") => Err(Error::InvalidInput("index cannot be empty".to_string()).into()),
        Some(index) => Ok(index),
        None => Ok(default_index),
    }
}

/// Reject a blank document id.
pub(crate) fn require_id(id: &str) -> Result<&str, McpError> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput("id cannot be empty".to_string()).into());
    }
    Ok(id)
}

/// Render `output` as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
