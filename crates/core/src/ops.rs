//! Document operations facade.
//!
//! Every public operation sequences cache invalidation, optional version
//! checks and backend calls. Cache rules:
//!
//! - `index` populates the cache after the backend accepts the write.
//! - `update_full`, `partial_update` and `delete` drop the entry before the
//!   backend is contacted, whatever the outcome.
//! - `get` and `exists` consult the cache first; nothing read from the
//!   backend is written back.
//!
//! `update_full` replaces a document by deleting and reindexing it. The two
//! steps are not atomic: if the process dies between them, or the reindex
//! fails, the document stays deleted.

use std::sync::Arc;

use serde_json::Value;

use crate::aggregate::{align_multi_get, hit_sources, parse_get, project_multi_get, project_multi_search};
use crate::backend::DocumentBackend;
use crate::cache::{DocumentCache, LruDocumentCache, cache_key};
use crate::occ::VersionCoordinator;
use crate::{Document, Error};

/// A value that is always produced, with the failure that forced it.
///
/// Used by operations whose failures are reported through a sentinel value
/// (`false` for `exists`, `-1` for `count`) instead of an `Err`.
#[derive(Debug)]
pub struct Reported<T> {
    pub value: T,
    pub error: Option<Error>,
}

impl<T> Reported<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn failed(value: T, error: Error) -> Self {
        Self { value, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Discard the sentinel and surface the error, if any.
    pub fn into_result(self) -> Result<T, Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

/// Sentinel count reported when the backend could not be asked.
pub const COUNT_UNAVAILABLE: i64 = -1;

/// Client-side access layer over a [`DocumentBackend`].
///
/// Cheap to clone; clones share the backend and the cache.
#[derive(Clone)]
pub struct DocumentClient {
    backend: Arc<dyn DocumentBackend>,
    cache: Arc<dyn DocumentCache>,
    coordinator: VersionCoordinator,
}

impl DocumentClient {
    /// Create a client over `backend` using `cache` for written documents.
    pub fn new(backend: Arc<dyn DocumentBackend>, cache: Arc<dyn DocumentCache>) -> Self {
        let coordinator = VersionCoordinator::new(Arc::clone(&cache), Arc::clone(&backend));
        Self { backend, cache, coordinator }
    }

    /// Create a client with a default-capacity LRU cache.
    pub fn with_default_cache(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::new(backend, Arc::new(LruDocumentCache::default()))
    }

    pub fn cache(&self) -> &Arc<dyn DocumentCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    /// Index a full document and cache it.
    pub async fn index(&self, index: &str, id: &str, doc: Document) -> Result<(), Error> {
        tracing::debug!(index, id, fields = doc.len(), "indexing document");
        self.backend.put(index, id, &doc).await?;
        self.cache.put(&cache_key(index, id), doc);
        Ok(())
    }

    /// Replace a document with a full new body.
    ///
    /// With `check_version`, the write only proceeds when the new body's
    /// version is at least the stored one; see [`VersionCoordinator::check`]
    /// for the failure cases. A failed delete is returned before anything is
    /// reindexed, leaving the stored document as it was.
    pub async fn update_full(&self, index: &str, id: &str, doc: Document, check_version: bool) -> Result<(), Error> {
        self.cache.remove(&cache_key(index, id));

        if check_version {
            self.coordinator.check(index, id, &doc).await?;
        }

        self.backend.delete(index, id).await.inspect_err(|e| {
            tracing::warn!(index, id, error = %e, "delete before reindex failed");
        })?;

        self.index(index, id, doc).await.inspect_err(|e| {
            tracing::warn!(index, id, error = %e, "reindex failed, document may now be absent");
        })
    }

    /// Apply a change script to a stored document.
    ///
    /// `script` is a backend update body such as `{"doc": {...}}`, not a
    /// full document.
    pub async fn partial_update(&self, index: &str, id: &str, script: &Value) -> Result<(), Error> {
        self.cache.remove(&cache_key(index, id));
        tracing::debug!(index, id, "applying partial update");
        self.backend.update(index, id, script).await
    }

    pub async fn delete(&self, index: &str, id: &str) -> Result<(), Error> {
        self.cache.remove(&cache_key(index, id));
        tracing::debug!(index, id, "deleting document");
        self.backend.delete(index, id).await
    }

    /// Whether a document exists. A cached entry answers `true` directly.
    ///
    /// Failures report `false` with the error attached.
    pub async fn exists(&self, index: &str, id: &str) -> Reported<bool> {
        if self.cache.get(&cache_key(index, id)).is_some() {
            return Reported::ok(true);
        }

        match self.backend.get(index, id).await {
            Ok(envelope) => match envelope.get("found").and_then(Value::as_bool) {
                Some(found) => Reported::ok(found),
                None => Reported::failed(
                    false,
                    Error::MalformedResponse(format!("get envelope for {id} has no found flag")),
                ),
            },
            Err(e) => {
                tracing::debug!(index, id, error = %e, "exists check failed");
                Reported::failed(false, e)
            }
        }
    }

    /// Fetch a document, from the cache when possible.
    pub async fn get(&self, index: &str, id: &str) -> Result<Option<Document>, Error> {
        if let Some(doc) = self.cache.get(&cache_key(index, id)) {
            tracing::debug!(index, id, "cache hit");
            return Ok(Some(doc));
        }
        let envelope = self.backend.get(index, id).await?;
        parse_get(id, envelope)
    }

    /// Fetch several documents in one round trip.
    ///
    /// Documents that were not found are omitted, so the result is not
    /// index-aligned with `ids`; use [`Self::multi_get_aligned`] for that.
    pub async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Document>, Error> {
        let items = self.backend.multi_get(index, ids).await?;
        let docs = project_multi_get(items);
        tracing::debug!(index, requested = ids.len(), found = docs.len(), "multi-get");
        Ok(docs)
    }

    /// Fetch several documents, one slot per requested id.
    pub async fn multi_get_aligned(&self, index: &str, ids: &[String]) -> Result<Vec<Option<Document>>, Error> {
        let items = self.backend.multi_get(index, ids).await?;
        Ok(align_multi_get(ids.len(), items))
    }

    /// Run several queries in one round trip and flatten their hits.
    pub async fn multi_search(&self, index: &str, queries: &[String]) -> Result<Vec<Document>, Error> {
        let responses = self.backend.multi_search(index, queries).await?;
        let docs = project_multi_search(responses);
        tracing::debug!(index, queries = queries.len(), hits = docs.len(), "multi-search");
        Ok(docs)
    }

    /// Count documents matching `query`.
    ///
    /// Failures report [`COUNT_UNAVAILABLE`] with the error attached.
    pub async fn count(&self, index: &str, query: &str) -> Reported<i64> {
        match self.backend.count(index, query).await {
            Ok(count) => Reported::ok(i64::try_from(count).unwrap_or(i64::MAX)),
            Err(e) => {
                tracing::debug!(index, error = %e, "count failed");
                Reported::failed(COUNT_UNAVAILABLE, e)
            }
        }
    }

    /// First hit of `query`, or `None` when nothing matched.
    pub async fn fetch_one(&self, index: &str, query: &str) -> Result<Option<Document>, Error> {
        let response = self.backend.search(index, query).await?;
        Ok(hit_sources(response).and_then(|hits| hits.into_iter().next()))
    }

    /// All hits of `query`.
    ///
    /// `None` when the response carries no hits section at all; an empty
    /// list when it does but nothing matched.
    pub async fn list_by_query(&self, index: &str, query: &str) -> Result<Option<Vec<Document>>, Error> {
        let response = self.backend.search(index, query).await?;
        Ok(hit_sources(response))
    }

    pub async fn refresh(&self) -> Result<(), Error> {
        self.backend.refresh().await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (Arc<MemoryBackend>, DocumentClient) {
        let backend = Arc::new(MemoryBackend::new());
        let client = DocumentClient::new(backend.clone(), Arc::new(LruDocumentCache::new(8)));
        (backend, client)
    }

    #[tokio::test]
    async fn test_index_then_get_served_from_cache() {
        let (backend, client) = setup();
        let d = doc(json!({ "label": "A", "_ver": "1" }));
        client.index("topics", "a", d.clone()).await.unwrap();

        backend.fail_with("backend must not be called");
        let calls = backend.calls();
        assert_eq!(client.get("topics", "a").await.unwrap(), Some(d));
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn test_failed_index_does_not_cache() {
        let (backend, client) = setup();
        backend.fail_with("down");
        assert!(client.index("topics", "a", doc(json!({}))).await.is_err());
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_get_miss_is_not_written_back() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "label": "A" })));

        let fetched = client.get("topics", "a").await.unwrap().unwrap();
        assert_eq!(fetched["label"], "A");
        assert!(client.cache().is_empty());
        assert!(client.get("topics", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_malformed_envelope() {
        let (backend, client) = setup();
        backend.set_raw_envelope("topics", "a", json!({ "error": { "type": "index_not_found_exception" } }));
        let err = client.get("topics", "a").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_delete_invalidates_even_when_backend_fails() {
        let (backend, client) = setup();
        client.index("topics", "a", doc(json!({ "label": "old" }))).await.unwrap();

        backend.fail_with("down");
        assert!(client.delete("topics", "a").await.is_err());

        backend.recover();
        backend.seed("topics", "a", doc(json!({ "label": "other-writer" })));
        let fetched = client.get("topics", "a").await.unwrap().unwrap();
        assert_eq!(fetched["label"], "other-writer");
    }

    #[tokio::test]
    async fn test_partial_update_invalidates_even_when_backend_fails() {
        let (backend, client) = setup();
        client.index("topics", "a", doc(json!({ "label": "old" }))).await.unwrap();

        backend.fail_with("down");
        assert!(client.partial_update("topics", "a", &json!({ "doc": { "label": "new" } })).await.is_err());
        assert!(client.cache().get(&cache_key("topics", "a")).is_none());
    }

    #[tokio::test]
    async fn test_partial_update_applies_script() {
        let (backend, client) = setup();
        client.index("topics", "a", doc(json!({ "label": "old", "details": "d" }))).await.unwrap();
        client
            .partial_update("topics", "a", &json!({ "doc": { "label": "new" } }))
            .await
            .unwrap();

        let fetched = client.get("topics", "a").await.unwrap().unwrap();
        assert_eq!(fetched["label"], "new");
        assert_eq!(fetched["details"], "d");
        assert_eq!(backend.stored("topics", "a").unwrap()["label"], "new");
    }

    #[tokio::test]
    async fn test_update_full_accepts_newer_and_equal_versions() {
        let (backend, client) = setup();
        client.index("topics", "a", doc(json!({ "_ver": "10", "label": "v10" }))).await.unwrap();

        client
            .update_full("topics", "a", doc(json!({ "_ver": "10", "label": "same" })), true)
            .await
            .unwrap();
        client
            .update_full("topics", "a", doc(json!({ "_ver": "12", "label": "v12" })), true)
            .await
            .unwrap();

        assert_eq!(backend.stored("topics", "a").unwrap()["label"], "v12");
        assert_eq!(client.get("topics", "a").await.unwrap().unwrap()["label"], "v12");
    }

    #[tokio::test]
    async fn test_update_full_conflict_returns_witness() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "_ver": "10", "label": "winner" })));

        let err = client
            .update_full("topics", "a", doc(json!({ "_ver": "9", "label": "loser" })), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::OptimisticLockConflict { candidate: 9, current: 10, .. }));
        assert_eq!(err.witness().unwrap()["label"], "winner");
        assert_eq!(backend.stored("topics", "a").unwrap()["label"], "winner");
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_update_full_missing_baseline() {
        let (backend, client) = setup();
        let err = client
            .update_full("topics", "ghost", doc(json!({ "_ver": "1" })), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentMissing(_)));
        assert!(backend.stored("topics", "ghost").is_none());
    }

    #[tokio::test]
    async fn test_update_full_missing_versions() {
        let (backend, client) = setup();
        backend.seed("topics", "bare", doc(json!({ "label": "x" })));
        backend.seed("topics", "versioned", doc(json!({ "_ver": "3" })));

        let err = client
            .update_full("topics", "bare", doc(json!({ "_ver": "4" })), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingVersionProperty(_)));

        let err = client
            .update_full("topics", "versioned", doc(json!({ "label": "y" })), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingVersionProperty(_)));
    }

    #[tokio::test]
    async fn test_update_full_without_check_replaces_body() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "_ver": "10", "extra": true })));

        client
            .update_full("topics", "a", doc(json!({ "label": "unversioned" })), false)
            .await
            .unwrap();

        let stored = backend.stored("topics", "a").unwrap();
        assert_eq!(stored["label"], "unversioned");
        assert!(stored.get("extra").is_none());
        assert!(client.cache().get(&cache_key("topics", "a")).is_some());
    }

    #[tokio::test]
    async fn test_update_full_surfaces_failed_delete() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "label": "old", "_ver": "1" })));
        backend.fail_on("delete", "delete timed out");

        let err = client
            .update_full("topics", "a", doc(json!({ "label": "new", "_ver": "2" })), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(ref m) if m == "delete timed out"));
        assert_eq!(backend.stored("topics", "a").unwrap()["label"], "old");
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_update_full_failed_reindex_leaves_document_absent() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "label": "old", "_ver": "1" })));
        backend.fail_on("put", "reindex rejected");

        let err = client
            .update_full("topics", "a", doc(json!({ "label": "new", "_ver": "2" })), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(ref m) if m == "reindex rejected"));
        assert!(backend.stored("topics", "a").is_none());
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_exists() {
        let (backend, client) = setup();
        backend.seed("topics", "stored", doc(json!({})));
        client.index("topics", "cached", doc(json!({}))).await.unwrap();

        assert!(client.exists("topics", "stored").await.value);
        assert!(!client.exists("topics", "missing").await.value);

        backend.fail_with("down");
        let cached = client.exists("topics", "cached").await;
        assert!(cached.value && cached.is_ok());

        let failed = client.exists("topics", "stored").await;
        assert!(!failed.value);
        assert!(failed.error.unwrap().is_transport());
    }

    #[tokio::test]
    async fn test_multi_get_omits_missing() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "label": "A" })));
        backend.seed("topics", "b", doc(json!({ "label": "B" })));

        let ids = vec!["a".to_string(), "x".to_string(), "b".to_string()];
        let docs = client.multi_get("topics", &ids).await.unwrap();
        let labels: Vec<_> = docs.iter().map(|d| d["label"].as_str().unwrap()).collect();
        assert_eq!(labels, vec!["A", "B"]);

        let aligned = client.multi_get_aligned("topics", &ids).await.unwrap();
        assert_eq!(aligned.len(), 3);
        assert!(aligned[1].is_none());
    }

    #[tokio::test]
    async fn test_multi_get_transport_failure() {
        let (backend, client) = setup();
        backend.fail_with("down");
        assert!(client.multi_get("topics", &["a".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn test_multi_search_flattens() {
        let (backend, client) = setup();
        backend.seed("topics", "x", doc(json!({ "label": "X", "kind": "k1" })));
        backend.seed("topics", "y", doc(json!({ "label": "Y", "kind": "k1" })));
        backend.seed("topics", "z", doc(json!({ "label": "Z", "kind": "k2" })));

        let queries = vec![
            r#"{"query":{"term":{"kind":"k1"}}}"#.to_string(),
            r#"{"query":{"term":{"kind":"k2"}}}"#.to_string(),
        ];
        let docs = client.multi_search("topics", &queries).await.unwrap();
        let labels: Vec<_> = docs.iter().map(|d| d["label"].as_str().unwrap()).collect();
        assert_eq!(labels, vec!["X", "Y", "Z"]);
    }

    #[tokio::test]
    async fn test_count_and_failure_sentinel() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({})));
        backend.seed("topics", "b", doc(json!({})));

        let counted = client.count("topics", "{}").await;
        assert_eq!(counted.value, 2);
        assert!(counted.is_ok());

        backend.fail_with("down");
        let failed = client.count("topics", "{}").await;
        assert_eq!(failed.value, COUNT_UNAVAILABLE);
        assert!(failed.error.is_some());
        assert!(failed.into_result().is_err());
    }

    #[tokio::test]
    async fn test_fetch_one_and_list_by_query() {
        let (backend, client) = setup();
        backend.seed("topics", "a", doc(json!({ "label": "A", "kind": "k" })));
        backend.seed("topics", "b", doc(json!({ "label": "B", "kind": "k" })));

        let query = r#"{"query":{"term":{"kind":"k"}}}"#;
        let first = client.fetch_one("topics", query).await.unwrap().unwrap();
        assert_eq!(first["label"], "A");

        let all = client.list_by_query("topics", query).await.unwrap().unwrap();
        assert_eq!(all.len(), 2);

        let none = r#"{"query":{"term":{"kind":"nope"}}}"#;
        assert!(client.fetch_one("topics", none).await.unwrap().is_none());
        assert_eq!(client.list_by_query("topics", none).await.unwrap().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_refresh_and_clear_cache() {
        let (backend, client) = setup();
        client.index("topics", "a", doc(json!({}))).await.unwrap();
        client.refresh().await.unwrap();
        assert_eq!(backend.refreshes(), 1);

        client.clear_cache();
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_is_scoped_by_index() {
        let (backend, client) = setup();
        client.index("topics", "a", doc(json!({ "label": "topic" }))).await.unwrap();

        assert!(client.get("proxies", "a").await.unwrap().is_none());
        assert!(backend.calls() >= 2);
    }
}
