//! Document model.
//!
//! A document is an arbitrary JSON object. The only key this layer reads is
//! the version field, which carries a decimal integer encoded as a string.

use serde_json::{Map, Value};

use crate::Error;

/// A JSON document body. Keys keep their insertion order.
pub type Document = Map<String, Value>;

/// Reserved key holding the document version.
pub const VERSION_PROPERTY: &str = "_ver";

/// Read the version of `doc`, identified as `id` in errors.
///
/// Returns `Ok(None)` when the field is absent or null. A JSON integer is
/// accepted as well as the canonical decimal string.
pub fn version_of(id: &str, doc: &Document) -> Result<Option<i64>, Error> {
    match doc.get(VERSION_PROPERTY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::InvalidVersion { id: id.to_string(), value: s.clone() }),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::InvalidVersion { id: id.to_string(), value: n.to_string() }),
        Some(other) => Err(Error::InvalidVersion { id: id.to_string(), value: other.to_string() }),
    }
}

/// Take the object out of a JSON value, if it is one.
pub fn into_document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
