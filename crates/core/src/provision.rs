//! Index provisioning.
//!
//! Runs once at startup: every configured index that does not exist yet is
//! created with the configured shard and replica settings, then given its
//! mapping. Existing indices are left untouched.

use std::path::Path;

use serde_json::Value;

use crate::backend::{DocumentBackend, IndexSettings};
use crate::config::{AppConfig, IndexConfig};
use crate::Error;

/// Read and parse a JSON mapping file.
pub async fn read_mapping(path: &Path) -> Result<Value, Error> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::ProvisionFailed(format!("cannot read mapping {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::ProvisionFailed(format!("mapping {} is not JSON: {e}", path.display())))
}

/// Create `index` if it does not exist. Returns whether it was created.
pub async fn ensure_index(
    backend: &dyn DocumentBackend, index: &IndexConfig, settings: &IndexSettings,
) -> Result<bool, Error> {
    if backend.index_exists(&index.name).await? {
        tracing::debug!(index = %index.name, "index already exists");
        return Ok(false);
    }

    let mapping = match &index.mapping {
        Some(path) => Some(read_mapping(path).await?),
        None => None,
    };

    backend.create_index(&index.name, settings).await?;
    if let Some(mapping) = mapping {
        backend.put_mapping(&index.name, &mapping).await?;
    }

    tracing::info!(
        index = %index.name,
        shards = settings.number_of_shards,
        replicas = settings.number_of_replicas,
        "created index"
    );
    Ok(true)
}

/// Provision every index named in `config`.
///
/// Returns the names of the indices that were created.
pub async fn ensure_indices(backend: &dyn DocumentBackend, config: &AppConfig) -> Result<Vec<String>, Error> {
    let settings = config.index_settings();
    let mut created = Vec::new();
    for index in &config.indices {
        if ensure_index(backend, index, &settings).await? {
            created.push(index.name.clone());
        }
    }
    Ok(created)
}
