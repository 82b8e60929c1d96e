//! Write tools: doc_index, doc_update, doc_partial_update, doc_delete.

use nodestore_core::{Document, DocumentClient};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_result, require_id, resolve_index};

/// Parameters for the doc_index tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexParams {
    /// Target index (defaults to the configured index).
    pub index: Option<String>,

    /// Document id.
    pub id: String,

    /// Document body.
    pub document: Document,
}

/// Parameters for the doc_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateParams {
    /// Target index (defaults to the configured index).
    pub index: Option<String>,

    /// Document id.
    pub id: String,

    /// Replacement document body.
    pub document: Document,

    /// Reject the write if the stored `_ver` is newer than the document's.
    #[serde(default)]
    pub check_version: bool,
}

/// Parameters for the doc_partial_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartialUpdateParams {
    /// Target index (defaults to the configured index).
    pub index: Option<String>,

    /// Document id.
    pub id: String,

    /// Change script, passed to the backend as-is (e.g. `{"doc": {...}}`).
    pub script: Value,
}

/// Parameters for the doc_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteParams {
    /// Target index (defaults to the configured index).
    pub index: Option<String>,

    /// Document id.
    pub id: String,
}

/// Output shared by the write tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WriteOutput {
    /// Index written to.
    pub index: String,

    /// Document id.
    pub id: String,

    /// Operation performed.
    pub result: String,
}

impl WriteOutput {
    fn new(index: &str, id: &str, result: &str) -> Self {
        Self { index: index.to_string(), id: id.to_string(), result: result.to_string() }
    }
}

/// Implementation of the doc_index tool.
pub async fn index_impl(
    client: &DocumentClient, default_index: &str, params: IndexParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;
    let id = require_id(&params.id)?;

    client.index(index, id, params.document).await?;
    json_result(&WriteOutput::new(index, id, "indexed"))
}

/// Implementation of the doc_update tool.
pub async fn update_impl(
    client: &DocumentClient, default_index: &str, params: UpdateParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;
    let id = require_id(&params.id)?;

    client
        .update_full(index, id, params.document, params.check_version)
        .await?;
    json_result(&WriteOutput::new(index, id, "replaced"))
}

/// Implementation of the doc_partial_update tool.
pub async fn partial_update_impl(
    client: &DocumentClient, default_index: &str, params: PartialUpdateParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;
    let id = require_id(&params.id)?;

    client.partial_update(index, id, &params.script).await?;
    json_result(&WriteOutput::new(index, id, "updated"))
}

/// Implementation of the doc_delete tool.
pub async fn delete_impl(
    client: &DocumentClient, default_index: &str, params: DeleteParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;
    let id = require_id(&params.id)?;

    client.delete(index, id).await?;
    json_result(&WriteOutput::new(index, id, "deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{DEFAULT_INDEX, client, output};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_index_defaults_index() {
        let (client, backend) = client();
        let params = IndexParams { index: None, id: "a".into(), document: doc(json!({ "label": "A" })) };

        let result = index_impl(&client, DEFAULT_INDEX, params).await.unwrap();
        let out: WriteOutput = output(&result);
        assert_eq!(out.index, "topics");
        assert_eq!(out.result, "indexed");
        assert_eq!(backend.stored("topics", "a").unwrap()["label"], "A");
    }

    #[tokio::test]
    async fn test_index_rejects_empty_id() {
        let (client, backend) = client();
        let params = IndexParams { index: None, id: " ".into(), document: Document::new() };

        let err = index_impl(&client, DEFAULT_INDEX, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_conflict_carries_witness() {
        let (client, backend) = client();
        backend.seed("topics", "a", doc(json!({ "label": "stored", "_ver": "5" })));

        let params = UpdateParams {
            index: None,
            id: "a".into(),
            document: doc(json!({ "label": "stale", "_ver": "4" })),
            check_version: true,
        };

        let err = update_impl(&client, DEFAULT_INDEX, params).await.unwrap_err();
        assert_eq!(err.code.0, -32025);
        assert_eq!(err.data.unwrap()["witness"]["label"], "stored");
        assert_eq!(backend.stored("topics", "a").unwrap()["label"], "stored");
    }

    #[tokio::test]
    async fn test_update_replaces() {
        let (client, backend) = client();
        backend.seed("topics", "a", doc(json!({ "label": "old", "extra": 1, "_ver": "1" })));

        let params = UpdateParams {
            index: None,
            id: "a".into(),
            document: doc(json!({ "label": "new", "_ver": "2" })),
            check_version: true,
        };

        update_impl(&client, DEFAULT_INDEX, params).await.unwrap();
        let stored = backend.stored("topics", "a").unwrap();
        assert_eq!(stored["label"], "new");
        assert!(!stored.contains_key("extra"));
    }

    #[tokio::test]
    async fn test_partial_update_and_delete() {
        let (client, backend) = client();
        backend.seed("proxies", "p", doc(json!({ "label": "P", "kind": "k" })));

        let params = PartialUpdateParams {
            index: Some("proxies".into()),
            id: "p".into(),
            script: json!({ "doc": { "label": "Q" } }),
        };
        partial_update_impl(&client, DEFAULT_INDEX, params).await.unwrap();
        assert_eq!(backend.stored("proxies", "p").unwrap()["label"], "Q");

        let params = DeleteParams { index: Some("proxies".into()), id: "p".into() };
        let out: WriteOutput = output(&delete_impl(&client, DEFAULT_INDEX, params).await.unwrap());
        assert_eq!(out.result, "deleted");
        assert!(backend.stored("proxies", "p").is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_code() {
        let (client, backend) = client();
        backend.fail_with("connection refused");

        let params = DeleteParams { index: None, id: "a".into() };
        let err = delete_impl(&client, DEFAULT_INDEX, params).await.unwrap_err();
        assert_eq!(err.code.0, -32020);
    }
}
