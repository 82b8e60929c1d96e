//! In-process cache for freshly written documents.
//!
//! Entries are created when this client indexes a document and dropped
//! before any mutation of it is attempted. Reads never back-fill the cache,
//! so an entry is always a body this client wrote itself.
//!
//! The cache is injected into [`crate::DocumentClient`] through the
//! [`DocumentCache`] trait; [`LruDocumentCache`] is the bounded default.

pub mod key;
pub mod recency;

use std::fmt::Debug;

use crate::Document;

pub use key::cache_key;
pub use recency::{DEFAULT_CAPACITY, LruDocumentCache};

/// Shared document cache.
///
/// Implementations must be safe to call from concurrent tasks; each method
/// is a single atomic step. None of them can fail.
pub trait DocumentCache: Send + Sync + Debug {
    /// Look up a document, marking it as recently used.
    fn get(&self, key: &str) -> Option<Document>;

    /// Insert or replace a document, marking it as recently used.
    fn put(&self, key: &str, doc: Document);

    /// Drop an entry if present.
    fn remove(&self, key: &str);

    /// Drop every entry.
    fn clear(&self);

    /// Number of entries currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
