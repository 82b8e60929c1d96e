//! Cache key composition.

/// Compose the cache key for a document in a collection.
///
/// Identifiers are only unique within a collection, so the collection name
/// is part of the key. The separator cannot appear in an index name.
pub fn cache_key(index: &str, id: &str) -> String {
    format!("{index}/{id}")
}
