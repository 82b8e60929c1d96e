//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no backend node is configured, and
    /// `ConfigError::Invalid` if:
    /// - a node is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `cache_capacity` or `num_shards` is 0
    /// - `user_agent` or `default_index` is empty
    /// - an index name is empty, contains `/`, or is listed twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::Missing {
                field: "nodes".into(),
                hint: "Set NODESTORE_NODES or `nodes` in the config file".into(),
            });
        }
        for node in &self.nodes {
            let parsed = url::Url::parse(node)
                .map_err(|e| ConfigError::Invalid { field: "nodes".into(), reason: format!("{node}: {e}") })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    field: "nodes".into(),
                    reason: format!("{node}: scheme must be http or https"),
                });
            }
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid { field: "cache_capacity".into(), reason: "must be greater than 0".into() });
        }

        if self.num_shards == 0 {
            return Err(ConfigError::Invalid { field: "num_shards".into(), reason: "must be greater than 0".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.default_index.is_empty() {
            return Err(ConfigError::Invalid { field: "default_index".into(), reason: "must not be empty".into() });
        }

        let mut seen = HashSet::new();
        for index in &self.indices {
            if index.name.is_empty() || index.name.contains('/') {
                return Err(ConfigError::Invalid {
                    field: "indices".into(),
                    reason: format!("invalid index name {:?}", index.name),
                });
            }
            if !seen.insert(index.name.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "indices".into(),
                    reason: format!("index {} listed twice", index.name),
                });
            }
        }

        if !self.indices.is_empty() && !seen.contains(self.default_index.as_str()) {
            tracing::warn!(
                default_index = %self.default_index,
                "default_index is not among the provisioned indices"
            );
        }

        Ok(())
    }
}
