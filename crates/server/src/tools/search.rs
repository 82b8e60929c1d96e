//! Query tools: doc_search, doc_multi_search, doc_count.

use nodestore_core::{Document, DocumentClient, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, resolve_index};

/// Parameters for the doc_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Index to search (defaults to the configured index).
    pub index: Option<String>,

    /// Query DSL body as a JSON string, e.g. `{"query":{"term":{"kind":"k"}}}`.
    pub query: String,

    /// Return only the first hit.
    #[serde(default)]
    pub first_only: bool,
}

/// Output from the doc_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchOutput {
    /// Hit sources, in backend order.
    pub hits: Vec<Document>,

    /// False when the backend response had no hits section.
    pub has_hits_section: bool,
}

/// Parameters for the doc_multi_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MultiSearchParams {
    /// Index to search (defaults to the configured index).
    pub index: Option<String>,

    /// Query DSL bodies as JSON strings.
    pub queries: Vec<String>,
}

/// Output from the doc_multi_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MultiSearchOutput {
    /// Hits of every successful query, flattened in query order.
    pub hits: Vec<Document>,
}

/// Parameters for the doc_count tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CountParams {
    /// Index to count in (defaults to the configured index).
    pub index: Option<String>,

    /// Query DSL body as a JSON string; `{}` counts everything.
    #[serde(default = "match_all")]
    pub query: String,
}

fn match_all() -> String {
    "{}".to_string()
}

/// Output from the doc_count tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CountOutput {
    /// Matching documents, or -1 when the count failed.
    pub count: i64,

    /// Failure that forced the -1.
    pub error: Option<String>,
}

/// Implementation of the doc_search tool.
pub async fn search_impl(
    client: &DocumentClient, default_index: &str, params: SearchParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;

    let output = if params.first_only {
        let first = client.fetch_one(index, &params.query).await?;
        SearchOutput { hits: first.into_iter().collect(), has_hits_section: true }
    } else {
        match client.list_by_query(index, &params.query).await? {
            Some(hits) => SearchOutput { hits, has_hits_section: true },
            None => SearchOutput { hits: Vec::new(), has_hits_section: false },
        }
    };
    json_result(&output)
}

/// Implementation of the doc_multi_search tool.
pub async fn multi_search_impl(
    client: &DocumentClient, default_index: &str, params: MultiSearchParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;

    let hits = client.multi_search(index, &params.queries).await?;
    json_result(&MultiSearchOutput { hits })
}

/// Implementation of the doc_count tool.
///
/// Never fails on backend errors; they are reported alongside `count: -1`.
pub async fn count_impl(
    client: &DocumentClient, default_index: &str, params: CountParams,
) -> Result<CallToolResult, McpError> {
    let index = resolve_index(&params.index, default_index)?;

    let reported = client.count(index, &params.query).await;
    json_result(&CountOutput { count: reported.value, error: reported.error.as_ref().map(Error::to_string) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{DEFAULT_INDEX, client, output};
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn term(kind: &str) -> String {
        json!({ "query": { "term": { "kind": kind } } }).to_string()
    }

    #[tokio::test]
    async fn test_search_all_and_first() {
        let (client, backend) = client();
        backend.seed("topics", "a", doc(json!({ "label": "A", "kind": "k" })));
        backend.seed("topics", "b", doc(json!({ "label": "B", "kind": "k" })));
        backend.seed("topics", "c", doc(json!({ "label": "C", "kind": "other" })));

        let params = SearchParams { index: None, query: term("k"), first_only: false };
        let out: SearchOutput = output(&search_impl(&client, DEFAULT_INDEX, params).await.unwrap());
        assert_eq!(out.hits.len(), 2);
        assert!(out.has_hits_section);

        let params = SearchParams { index: None, query: term("k"), first_only: true };
        let out: SearchOutput = output(&search_impl(&client, DEFAULT_INDEX, params).await.unwrap());
        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.hits[0]["kind"], "k");
    }

    #[tokio::test]
    async fn test_search_invalid_query() {
        let (client, _backend) = client();
        let params = SearchParams { index: None, query: "kind:k".into(), first_only: false };

        let err = search_impl(&client, DEFAULT_INDEX, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_multi_search_flattens() {
        let (client, backend) = client();
        backend.seed("topics", "a", doc(json!({ "kind": "x" })));
        backend.seed("topics", "b", doc(json!({ "kind": "y" })));

        let params = MultiSearchParams { index: None, queries: vec![term("x"), "not json".into(), term("y")] };
        let out: MultiSearchOutput = output(&multi_search_impl(&client, DEFAULT_INDEX, params).await.unwrap());
        assert_eq!(out.hits.len(), 2);
        assert_eq!(out.hits[0]["kind"], "x");
        assert_eq!(out.hits[1]["kind"], "y");
    }

    #[tokio::test]
    async fn test_count_and_sentinel() {
        let (client, backend) = client();
        backend.seed("topics", "a", doc(json!({ "kind": "x" })));
        backend.seed("topics", "b", doc(json!({ "kind": "x" })));

        let params = CountParams { index: None, query: match_all() };
        let out: CountOutput = output(&count_impl(&client, DEFAULT_INDEX, params).await.unwrap());
        assert_eq!(out.count, 2);
        assert!(out.error.is_none());

        backend.fail_with("unreachable");
        let params = CountParams { index: None, query: match_all() };
        let out: CountOutput = output(&count_impl(&client, DEFAULT_INDEX, params).await.unwrap());
        assert_eq!(out.count, -1);
        assert!(out.error.is_some());
    }
}
