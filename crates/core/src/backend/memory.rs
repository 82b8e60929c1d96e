//! In-memory document backend.
//!
//! Answers with the same envelope shapes as an Elasticsearch-compatible
//! store, counts every call, and can be switched into a failing state.
//! Used by tests and for running the server without a cluster.
//!
//! Supported queries: `{}`, `match_all`, `term` (exact value, or membership
//! for array fields) and `ids`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use super::{DocumentBackend, IndexSettings};
use crate::{Document, Error};

#[derive(Debug, Default)]
struct StoredIndex {
    settings: IndexSettings,
    mapping: Option<Value>,
    docs: BTreeMap<String, Document>,
}

/// Recording in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: Mutex<HashMap<String, StoredIndex>>,
    raw_envelopes: Mutex<HashMap<(String, String), Value>>,
    failure: Mutex<Option<String>>,
    failures_on: Mutex<HashMap<&'static str, String>>,
    calls: AtomicUsize,
    refreshes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a transport error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Make every subsequent call of one primitive (`"put"`, `"delete"` ...)
    /// fail with a transport error.
    pub fn fail_on(&self, primitive: &'static str, message: impl Into<String>) {
        self.failures_on.lock().insert(primitive, message.into());
    }

    /// Stop failing, globally and per primitive.
    pub fn recover(&self) {
        *self.failure.lock() = None;
        self.failures_on.lock().clear();
    }

    /// Number of primitive calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Store a document directly, bypassing call counting.
    ///
    /// Simulates a write made by another client instance.
    pub fn seed(&self, index: &str, id: &str, doc: Document) {
        self.indices
            .lock()
            .entry(index.to_string())
            .or_default()
            .docs
            .insert(id.to_string(), doc);
    }

    /// Answer get and multi-get for `id` with `envelope` verbatim.
    pub fn set_raw_envelope(&self, index: &str, id: &str, envelope: Value) {
        self.raw_envelopes
            .lock()
            .insert((index.to_string(), id.to_string()), envelope);
    }

    fn envelope(&self, index: &str, id: &str) -> Value {
        if let Some(raw) = self.raw_envelopes.lock().get(&(index.to_string(), id.to_string())) {
            return raw.clone();
        }
        match self.stored(index, id) {
            Some(doc) => json!({ "_index": index, "_id": id, "found": true, "_source": doc }),
            None => json!({ "_index": index, "_id": id, "found": false }),
        }
    }

    /// Read a stored document directly, bypassing call counting.
    pub fn stored(&self, index: &str, id: &str) -> Option<Document> {
        self.indices.lock().get(index).and_then(|i| i.docs.get(id).cloned())
    }

    pub fn settings_of(&self, index: &str) -> Option<IndexSettings> {
        self.indices.lock().get(index).map(|i| i.settings)
    }

    pub fn mapping_of(&self, index: &str) -> Option<Value> {
        self.indices.lock().get(index).and_then(|i| i.mapping.clone())
    }

    fn begin(&self, primitive: &'static str) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().as_ref() {
            return Err(Error::Transport(message.clone()));
        }
        match self.failures_on.lock().get(primitive) {
            Some(message) => Err(Error::Transport(message.clone())),
            None => Ok(()),
        }
    }

    fn matching(&self, index: &str, query: &str) -> Result<Vec<(String, Document)>, Error> {
        let query = parse_query(query)?;
        let indices = self.indices.lock();
        let Some(stored) = indices.get(index) else {
            return Ok(Vec::new());
        };
        Ok(stored
            .docs
            .iter()
            .filter(|(id, doc)| query.matches(id, doc))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }

    fn search_response(index: &str, hits: Vec<(String, Document)>) -> Value {
        let total = hits.len();
        let hits: Vec<Value> = hits
            .into_iter()
            .map(|(id, doc)| json!({ "_index": index, "_id": id, "_source": doc }))
            .collect();
        json!({ "hits": { "total": { "value": total }, "hits": hits } })
    }
}

enum Query {
    All,
    Term { field: String, value: Value },
    Ids(Vec<String>),
}

impl Query {
    fn matches(&self, id: &str, doc: &Document) -> bool {
        match self {
            Query::All => true,
            Query::Term { field, value } => match doc.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                Some(found) => found == value,
                None => false,
            },
            Query::Ids(ids) => ids.iter().any(|i| i == id),
        }
    }
}

fn parse_query(query: &str) -> Result<Query, Error> {
    let body: Value =
        serde_json::from_str(query).map_err(|e| Error::InvalidInput(format!("query is not JSON: {e}")))?;

    let Some(clause) = body.get("query") else {
        return Ok(Query::All);
    };

    if clause.get("match_all").is_some() {
        return Ok(Query::All);
    }

    if let Some(term) = clause.get("term").and_then(Value::as_object)
        && let Some((field, value)) = term.iter().next()
    {
        let value = value.get("value").cloned().unwrap_or_else(|| value.clone());
        return Ok(Query::Term { field: field.clone(), value });
    }

    if let Some(values) = clause.pointer("/ids/values").and_then(Value::as_array) {
        let ids = values.iter().filter_map(Value::as_str).map(str::to_string).collect();
        return Ok(Query::Ids(ids));
    }

    Err(Error::InvalidInput(format!("unsupported query: {clause}")))
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn put(&self, index: &str, id: &str, doc: &Document) -> Result<(), Error> {
        self.begin("put")?;
        self.seed(index, id, doc.clone());
        Ok(())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Value, Error> {
        self.begin("get")?;
        Ok(self.envelope(index, id))
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), Error> {
        self.begin("delete")?;
        if let Some(stored) = self.indices.lock().get_mut(index) {
            stored.docs.remove(id);
        }
        Ok(())
    }

    async fn update(&self, index: &str, id: &str, script: &Value) -> Result<(), Error> {
        self.begin("update")?;
        let Some(changes) = script.get("doc").and_then(Value::as_object) else {
            return Err(Error::InvalidInput("only partial-document updates are supported".to_string()));
        };
        let mut indices = self.indices.lock();
        let doc = indices
            .get_mut(index)
            .and_then(|i| i.docs.get_mut(id))
            .ok_or_else(|| Error::Transport(format!("document_missing_exception: [{id}]")))?;
        for (key, value) in changes {
            doc.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Value>, Error> {
        self.begin("multi_get")?;
        Ok(ids.iter().map(|id| self.envelope(index, id)).collect())
    }

    async fn search(&self, index: &str, query: &str) -> Result<Value, Error> {
        self.begin("search")?;
        let hits = self.matching(index, query)?;
        Ok(Self::search_response(index, hits))
    }

    async fn multi_search(&self, index: &str, queries: &[String]) -> Result<Vec<Value>, Error> {
        self.begin("multi_search")?;
        Ok(queries
            .iter()
            .map(|query| match self.matching(index, query) {
                Ok(hits) => Self::search_response(index, hits),
                Err(e) => json!({ "error": { "reason": e.to_string() }, "status": 400 }),
            })
            .collect())
    }

    async fn count(&self, index: &str, query: &str) -> Result<u64, Error> {
        self.begin("count")?;
        Ok(self.matching(index, query)?.len() as u64)
    }

    async fn refresh(&self) -> Result<(), Error> {
        self.begin("refresh")?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, Error> {
        self.begin("index_exists")?;
        Ok(self.indices.lock().contains_key(index))
    }

    async fn create_index(&self, index: &str, settings: &IndexSettings) -> Result<(), Error> {
        self.begin("create_index")?;
        let mut indices = self.indices.lock();
        if indices.contains_key(index) {
            return Err(Error::Transport(format!("resource_already_exists_exception: [{index}]")));
        }
        indices.insert(index.to_string(), StoredIndex { settings: *settings, ..Default::default() });
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), Error> {
        self.begin("put_mapping")?;
        let mut indices = self.indices.lock();
        let stored = indices
            .get_mut(index)
            .ok_or_else(|| Error::Transport(format!("index_not_found_exception: [{index}]")))?;
        stored.mapping = Some(mapping.clone());
        Ok(())
    }
}
