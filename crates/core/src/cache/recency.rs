//! Bounded least-recently-used document cache.

use std::fmt;
use std::num::NonZeroUsize;

use ::lru::LruCache;
use parking_lot::Mutex;

use super::DocumentCache;
use crate::Document;

/// Default number of cached documents.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fixed-capacity LRU cache guarded by a single mutex.
///
/// `get` bumps recency, so it takes the same lock as `put`, `remove` and
/// `clear`. Inserting past capacity evicts the least-recently-used entry
/// before the insert completes.
pub struct LruDocumentCache {
    entries: Mutex<LruCache<String, Document>>,
}

impl LruDocumentCache {
    /// Create a cache holding at most `capacity` documents.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Whether `key` is cached, without counting as a use.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }
}

impl Default for LruDocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for LruDocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("LruDocumentCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

impl DocumentCache for LruDocumentCache {
    fn get(&self, key: &str) -> Option<Document> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, doc: Document) {
        if let Some((evicted, _)) = self.entries.lock().push(key.to_string(), doc)
            && evicted != key
        {
            tracing::debug!(evicted = %evicted, "document cache full, evicted least recently used entry");
        }
    }

    fn remove(&self, key: &str) {
        self.entries.lock().pop(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
