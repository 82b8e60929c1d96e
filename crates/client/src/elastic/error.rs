//! Elasticsearch backend error types.

use std::sync::Arc;

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Errors from the Elasticsearch REST backend.
#[derive(Debug, thiserror::Error)]
pub enum ElasticError {
    /// No backend node configured.
    #[error("no backend nodes configured")]
    NoNodes,

    /// A node URL cannot be used as a base for requests.
    #[error("invalid node url {url}: {reason}")]
    InvalidNode { url: String, reason: String },

    /// Query string is not a JSON body.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Non-success HTTP response.
    #[error("HTTP error {status}: {body}")]
    HttpError { status: u16, body: String },

    /// Response body parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ElasticError {
    /// Build an `HttpError`, truncating long bodies.
    pub fn http(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_ERROR_BODY) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        ElasticError::HttpError { status, body }
    }
}

impl From<reqwest::Error> for ElasticError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ElasticError::Timeout } else { ElasticError::Network(Arc::new(err)) }
    }
}

impl From<ElasticError> for nodestore_core::Error {
    fn from(err: ElasticError) -> Self {
        match err {
            ElasticError::InvalidQuery(msg) => nodestore_core::Error::InvalidInput(msg),
            ElasticError::Parse(msg) => nodestore_core::Error::MalformedResponse(msg),
            other => nodestore_core::Error::Transport(other.to_string()),
        }
    }
}
