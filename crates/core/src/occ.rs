//! Optimistic concurrency checks.
//!
//! A versioned write may proceed when its version is at least the last
//! known stored version. Equal versions are accepted, so this is a floor
//! rather than an exact-version fence: two writers carrying the same
//! version both succeed, and two checks racing on one id can both pass.

use std::sync::Arc;

use crate::aggregate::parse_get;
use crate::backend::DocumentBackend;
use crate::cache::{DocumentCache, cache_key};
use crate::document::version_of;
use crate::{Document, Error};

/// Versions compared by a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCheck {
    pub current: i64,
    pub candidate: i64,
}

/// Compare `candidate` against the stored baseline `current`.
///
/// The baseline is checked for a version before the candidate is.
pub fn compare_versions(id: &str, current: &Document, candidate: &Document) -> Result<VersionCheck, Error> {
    let current_version =
        version_of(id, current)?.ok_or_else(|| Error::MissingVersionProperty(format!("stored {id}")))?;
    let candidate_version =
        version_of(id, candidate)?.ok_or_else(|| Error::MissingVersionProperty(format!("candidate {id}")))?;

    if candidate_version < current_version {
        return Err(Error::OptimisticLockConflict {
            id: id.to_string(),
            candidate: candidate_version,
            current: current_version,
            witness: Box::new(current.clone()),
        });
    }

    Ok(VersionCheck { current: current_version, candidate: candidate_version })
}

/// Resolves the baseline for a versioned write and compares against it.
#[derive(Clone)]
pub struct VersionCoordinator {
    cache: Arc<dyn DocumentCache>,
    backend: Arc<dyn DocumentBackend>,
}

impl VersionCoordinator {
    pub fn new(cache: Arc<dyn DocumentCache>, backend: Arc<dyn DocumentBackend>) -> Self {
        Self { cache, backend }
    }

    /// Last known version of `id`: the cached body, else the stored one.
    ///
    /// A backend read here does not populate the cache.
    pub async fn baseline(&self, index: &str, id: &str) -> Result<Option<Document>, Error> {
        if let Some(doc) = self.cache.get(&cache_key(index, id)) {
            tracing::debug!(index, id, "version baseline served from cache");
            return Ok(Some(doc));
        }
        let envelope = self.backend.get(index, id).await?;
        parse_get(id, envelope)
    }

    /// Decide whether `candidate` may replace the document stored as `id`.
    ///
    /// # Errors
    ///
    /// - `DocumentMissing` if there is no cached or stored baseline
    /// - `MissingVersionProperty` if either side has no version
    /// - `InvalidVersion` if a version is not a decimal integer
    /// - `OptimisticLockConflict` if the candidate is older, with the
    ///   stored document as witness
    /// - `Transport` / `MalformedResponse` from the baseline read
    pub async fn check(&self, index: &str, id: &str, candidate: &Document) -> Result<VersionCheck, Error> {
        let current = self
            .baseline(index, id)
            .await?
            .ok_or_else(|| Error::DocumentMissing(id.to_string()))?;

        let outcome = compare_versions(id, &current, candidate);
        if let Err(Error::OptimisticLockConflict { candidate, current, .. }) = &outcome {
            tracing::debug!(index, id, candidate, current, "optimistic lock conflict");
        }
        outcome
    }
}
