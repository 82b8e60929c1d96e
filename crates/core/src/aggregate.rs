//! Batch result aggregation.
//!
//! Projects raw backend envelopes down to document bodies. Single-document
//! reads are strict about the envelope shape; batch projections are not,
//! and treat any item they cannot interpret as not found so one bad item
//! never fails the batch.

use serde_json::Value;

use crate::document::into_document;
use crate::{Document, Error};

/// Take the `_source` body out of an envelope.
fn take_source(envelope: Value) -> Option<Document> {
    match envelope {
        Value::Object(mut map) => map.remove("_source").and_then(into_document),
        _ => None,
    }
}

/// Source of a multi-get item, if it is marked found and carries a body.
fn found_source(item: Value) -> Option<Document> {
    if item.get("found").and_then(Value::as_bool) == Some(true) {
        take_source(item)
    } else {
        None
    }
}

/// Interpret a single-document get envelope.
///
/// `found: false` is absence. A missing `found` flag, or a found document
/// without an object body, is a malformed response.
pub fn parse_get(id: &str, envelope: Value) -> Result<Option<Document>, Error> {
    match envelope.get("found").and_then(Value::as_bool) {
        Some(false) => Ok(None),
        Some(true) => take_source(envelope)
            .map(Some)
            .ok_or_else(|| Error::MalformedResponse(format!("found document {id} has no _source object"))),
        None => Err(Error::MalformedResponse(format!("get envelope for {id} has no found flag: {envelope}"))),
    }
}

/// Project multi-get items to the documents that were found.
///
/// Order among found items follows the backend response. Not-found and
/// malformed items are dropped without a placeholder, so the result is not
/// index-aligned with the request.
pub fn project_multi_get(items: Vec<Value>) -> Vec<Document> {
    items.into_iter().filter_map(found_source).collect()
}

/// Project multi-get items to one slot per requested id.
///
/// Items are matched by position; a short response leaves trailing slots
/// empty and surplus items are ignored.
pub fn align_multi_get(requested: usize, items: Vec<Value>) -> Vec<Option<Document>> {
    let mut aligned: Vec<Option<Document>> = items.into_iter().take(requested).map(found_source).collect();
    aligned.resize(requested, None);
    aligned
}

/// Sources of every hit in one search response.
///
/// Returns `None` when the response has no `hits.hits` array at all, which
/// callers treat as an absent result. Hits without an object `_source` are
/// skipped.
pub fn hit_sources(response: Value) -> Option<Vec<Document>> {
    let Value::Object(mut response) = response else {
        return None;
    };
    let Some(Value::Object(mut hits)) = response.remove("hits") else {
        return None;
    };
    let Some(Value::Array(hits)) = hits.remove("hits") else {
        return None;
    };
    Some(hits.into_iter().filter_map(take_source).collect())
}

/// Flatten per-query search responses into one ordered list of sources.
///
/// Query order is preserved, then hit order within each query. Responses
/// that report an error or lack hits contribute nothing.
pub fn project_multi_search(responses: Vec<Value>) -> Vec<Document> {
    responses
        .into_iter()
        .enumerate()
        .flat_map(|(position, response)| {
            if let Some(error) = response.get("error") {
                tracing::debug!(position, %error, "multi-search item failed, skipping");
            }
            hit_sources(response).unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn found(label: &str) -> Value {
        json!({ "_index": "topics", "_id": label, "found": true, "_source": { "label": label } })
    }

    fn not_found(id: &str) -> Value {
        json!({ "_index": "topics", "_id": id, "found": false })
    }

    fn hits(labels: &[&str]) -> Value {
        let hits: Vec<Value> = labels
            .iter()
            .map(|l| json!({ "_id": l, "_source": { "label": l } }))
            .collect();
        json!({ "hits": { "hits": hits } })
    }

    fn labels(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d["label"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_parse_get_found() {
        let doc = parse_get("A", found("A")).unwrap().unwrap();
        assert_eq!(doc["label"], "A");
    }

    #[test]
    fn test_parse_get_not_found() {
        assert!(parse_get("A", not_found("A")).unwrap().is_none());
    }

    #[test]
    fn test_parse_get_malformed() {
        let err = parse_get("A", json!({ "error": "index_not_found_exception" })).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));

        let err = parse_get("A", json!({ "found": true, "_source": "oops" })).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_multi_get_omits_not_found() {
        let docs = project_multi_get(vec![found("A"), not_found("x"), found("B")]);
        assert_eq!(labels(&docs), vec!["A", "B"]);
    }

    #[test]
    fn test_multi_get_treats_malformed_as_not_found() {
        let items = vec![
            json!("garbage"),
            json!({ "found": true }),
            json!({ "_source": { "label": "no-flag" } }),
            found("C"),
            json!({ "_id": "e", "error": { "type": "shard_failure" } }),
        ];
        assert_eq!(labels(&project_multi_get(items)), vec!["C"]);
    }

    #[test]
    fn test_multi_get_empty() {
        assert!(project_multi_get(Vec::new()).is_empty());
    }

    #[test]
    fn test_align_multi_get() {
        let aligned = align_multi_get(3, vec![found("A"), not_found("x"), found("B")]);
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[0].as_ref().unwrap()["label"], "A");
        assert!(aligned[1].is_none());
        assert_eq!(aligned[2].as_ref().unwrap()["label"], "B");
    }

    #[test]
    fn test_align_multi_get_short_response() {
        let aligned = align_multi_get(3, vec![found("A")]);
        assert_eq!(aligned.len(), 3);
        assert!(aligned[1].is_none() && aligned[2].is_none());
    }

    #[test]
    fn test_hit_sources() {
        let docs = hit_sources(hits(&["X", "Y"])).unwrap();
        assert_eq!(labels(&docs), vec!["X", "Y"]);
        assert!(hit_sources(json!({ "took": 3 })).is_none());
        assert!(hit_sources(hits(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_multi_search_flattens_in_order() {
        let docs = project_multi_search(vec![hits(&["X", "Y"]), hits(&["Z"])]);
        assert_eq!(labels(&docs), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_multi_search_skips_failed_queries() {
        let failed = json!({ "error": { "type": "parsing_exception" }, "status": 400 });
        let docs = project_multi_search(vec![failed, hits(&["Z"]), json!(null)]);
        assert_eq!(labels(&docs), vec!["Z"]);
    }
}
