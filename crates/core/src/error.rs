//! Unified error types for nodestore.
//!
//! Every document operation returns one of these. The message prefix is a
//! stable code so callers that only see the rendered string can still branch.

use rmcp::model::{ErrorCode, ErrorData as McpError};

use crate::document::Document;

/// Unified error types for document operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a query that is not JSON).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Backend unreachable, timed out, or answered with a failure status.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// Backend answered but the envelope could not be interpreted.
    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(String),

    /// No stored or cached document to compare a versioned write against.
    #[error("DOCUMENT_MISSING: {0}")]
    DocumentMissing(String),

    /// One side of a version comparison has no version field.
    #[error("MISSING_VERSION_PROPERTY: {0}")]
    MissingVersionProperty(String),

    /// A version field is present but is not a decimal integer.
    #[error("INVALID_VERSION: {id} has version {value}")]
    InvalidVersion { id: String, value: String },

    /// The candidate version is older than the stored one.
    ///
    /// `witness` is the stored document that won the race.
    #[error("OPTIMISTIC_LOCK_CONFLICT: {id} candidate version {candidate} is older than stored version {current}")]
    OptimisticLockConflict { id: String, candidate: i64, current: i64, witness: Box<Document> },

    /// Index provisioning failed at startup.
    #[error("PROVISION_FAILED: {0}")]
    ProvisionFailed(String),
}

impl Error {
    /// The stored document carried by a conflict, if this is one.
    pub fn witness(&self) -> Option<&Document> {
        match self {
            Error::OptimisticLockConflict { witness, .. } => Some(witness),
            _ => None,
        }
    }

    /// Whether the error came from the backend rather than from a local check.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::MalformedResponse(_))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::Transport(_) => -32020,
            Error::MalformedResponse(_) => -32021,
            Error::DocumentMissing(_) => -32022,
            Error::MissingVersionProperty(_) => -32023,
            Error::InvalidVersion { .. } => -32024,
            Error::OptimisticLockConflict { .. } => -32025,
            Error::ProvisionFailed(_) => -32026,
        };

        let data = err
            .witness()
            .map(|witness| serde_json::json!({ "witness": witness }));

        McpError { code: ErrorCode(code), message: err.to_string().into(), data }
    }
}
