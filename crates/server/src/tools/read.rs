//! Read tools: doc_get, doc_exists, doc_multi_get.

use nodestore_core::{Document, DocumentClient, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, require_id, resolve_index};

/// Parameters for the doc_get and doc_exists tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetParams {
    /// Index to read (defaults to the configured index).
    pub index: Option<String>,

    /// Document id.
    pub id: String,
}

/// Output from the doc_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetOutput {
    pub id: String,

    /// Whether the document was found.
    pub found: bool,

    /// Document body, absent when not found.
    pub document: Option<Document>,
}

/// Output from the doc_exists tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExistsOutput {
    pub id: String,

    /// `false` both when the document is absent and when the check failed.
    pub exists: bool,

    /// Failure that forced `exists` to `false`.
    pub error: Option<String>,
}

/// Parameters for the doc_multi_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MultiGetParams {
    /// Index to read (defaults to the configured index).
    pub index: Option<String>,

    /// Document ids.
    pub ids: Vec<String>,

    /// Return one slot per id (null when missing) instead of only found documents.
    #[serde(default)]
    pub aligned: bool,
}

/// Output from the doc_multi_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MultiGetOutput {
    /// Found documents only, in response order.
    Found { documents: Vec<Document> },

    /// One slot per requested id.
    Aligned { slots: Vec<Option<Document>> },
}

/// Implementation of the doc_get tool.
pub async fn get_impl(client: &DocumentClient, default_index: &str, params: GetParams) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;
    let id = require_id(&params.id)?;

    let document = client.get(index, id).await?;
    json_result(&GetOutput { id: params.id.clone(), found: document.is_some(), document })
}

/// Implementation of the doc_exists tool.
///
/// Never fails on backend errors; they are reported alongside `exists: false`.
pub async fn exists_impl(
    client: &DocumentClient, default_index: &str, params: GetParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;
    let id = require_id(&params.id)?;

    let reported = client.exists(index, id).await;
    json_result(&ExistsOutput {
        id: params.id.clone(),
        exists: reported.value,
        error: reported.error.as_ref().map(Error::to_string),
    })
}

/// Implementation of the doc_multi_get tool.
pub async fn multi_get_impl(
    client: &DocumentClient, default_index: &str, params: MultiGetParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;

    let output = if params.aligned {
        MultiGetOutput::Aligned { slots: client.multi_get_aligned(index, &params.ids).await? }
    } else {
        MultiGetOutput::Found { documents: client.multi_get(index, &params.ids).await? }
    };
    json_result(&output)
}
