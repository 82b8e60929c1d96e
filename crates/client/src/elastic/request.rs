//! Request body construction and validation.

use nodestore_core::IndexSettings;
use serde_json::{Value, json};

use super::ElasticError;

/// Validate a query string and re-serialize it on a single line.
///
/// Queries are passed through verbatim as the search body, so they must be
/// a JSON object. Compacting is required for the NDJSON multi-search body.
pub fn compact_query(query: &str) -> Result<String, ElasticError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ElasticError::InvalidQuery("query cannot be empty".to_string()));
    }

    let body: Value = serde_json::from_str(trimmed).map_err(|e| ElasticError::InvalidQuery(e.to_string()))?;
    if !body.is_object() {
        return Err(ElasticError::InvalidQuery("query must be a JSON object".to_string()));
    }

    Ok(body.to_string())
}

/// NDJSON body for `_msearch`: an empty header line before each query.
///
/// The index comes from the request path, so headers stay empty.
pub fn msearch_body(queries: &[String]) -> Result<String, ElasticError> {
    let mut body = String::new();
    for query in queries {
        body.push_str("{}\n");
        body.push_str(&compact_query(query)?);
        body.push('\n');
    }
    Ok(body)
}

/// Body for `_mget` by id.
pub fn mget_body(ids: &[String]) -> Value {
    json!({ "ids": ids })
}

/// Body for index creation.
pub fn settings_body(settings: &IndexSettings) -> Value {
    json!({
        "settings": {
            "number_of_shards": settings.number_of_shards,
            "number_of_replicas": settings.number_of_replicas,
        }
    })
}
