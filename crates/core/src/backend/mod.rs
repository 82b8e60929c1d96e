//! Document backend capability.
//!
//! The facade reaches the remote store only through [`DocumentBackend`].
//! Read primitives hand back raw JSON envelopes so that envelope parsing,
//! and its tolerance for malformed items, stays in this crate
//! (see [`crate::aggregate`]).

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Document, Error};

pub use memory::MemoryBackend;

/// Shard and replica settings applied when an index is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { number_of_shards: 1, number_of_replicas: 0 }
    }
}

/// Primitives the facade needs from the remote store.
///
/// Every call is one request/response round trip. Implementations own
/// connection pooling and timeouts and report any failure to communicate
/// as [`Error::Transport`].
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Store `doc` under `id`, replacing any previous body.
    async fn put(&self, index: &str, id: &str, doc: &Document) -> Result<(), Error>;

    /// Fetch the envelope for `id`: `{"found": bool, "_source": {...}}`.
    async fn get(&self, index: &str, id: &str) -> Result<Value, Error>;

    /// Delete `id`. Deleting an absent document is not an error.
    async fn delete(&self, index: &str, id: &str) -> Result<(), Error>;

    /// Apply a change script (not a full document) to `id`.
    async fn update(&self, index: &str, id: &str, script: &Value) -> Result<(), Error>;

    /// Fetch one envelope per id, in request order.
    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Value>, Error>;

    /// Run one query; the response holds `{"hits": {"hits": [{"_source": {...}}]}}`.
    async fn search(&self, index: &str, query: &str) -> Result<Value, Error>;

    /// Run several queries in one round trip, one response per query.
    async fn multi_search(&self, index: &str, queries: &[String]) -> Result<Vec<Value>, Error>;

    /// Count documents matching `query`.
    async fn count(&self, index: &str, query: &str) -> Result<u64, Error>;

    /// Make recent writes visible to search.
    async fn refresh(&self) -> Result<(), Error>;

    async fn index_exists(&self, index: &str) -> Result<bool, Error>;

    async fn create_index(&self, index: &str, settings: &IndexSettings) -> Result<(), Error>;

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), Error>;
}
