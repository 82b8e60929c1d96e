//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (NODESTORE_*)
//! 2. TOML config file (if NODESTORE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::backend::IndexSettings;
use crate::cache::DEFAULT_CAPACITY;

mod validation;

pub use validation::ConfigError;

/// An index provisioned at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name.
    pub name: String,

    /// Path to a JSON mapping file installed when the index is created.
    #[serde(default)]
    pub mapping: Option<PathBuf>,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (NODESTORE_*)
/// 2. TOML config file (if NODESTORE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URLs of the backend nodes, e.g. `http://localhost:9200`.
    ///
    /// Set via NODESTORE_NODES environment variable.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Backend request timeout in milliseconds.
    ///
    /// Set via NODESTORE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for backend requests.
    ///
    /// Set via NODESTORE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Idle connections kept per backend node.
    ///
    /// Set via NODESTORE_MAX_IDLE_PER_HOST environment variable.
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// Number of freshly written documents kept in the client cache.
    ///
    /// Set via NODESTORE_CACHE_CAPACITY environment variable.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Whether index writes ask the backend to refresh immediately.
    ///
    /// Set via NODESTORE_REFRESH_ON_WRITE environment variable.
    #[serde(default = "default_true")]
    pub refresh_on_write: bool,

    /// Index used by tools when a call names none.
    ///
    /// Set via NODESTORE_DEFAULT_INDEX environment variable.
    #[serde(default = "default_index")]
    pub default_index: String,

    /// Indices to provision at startup.
    ///
    /// Set in the TOML file as `[[indices]]` tables.
    #[serde(default)]
    pub indices: Vec<IndexConfig>,

    /// Primary shards for newly created indices.
    ///
    /// Set via NODESTORE_NUM_SHARDS environment variable.
    #[serde(default = "default_num_shards")]
    pub num_shards: u32,

    /// Replicas for newly created indices.
    ///
    /// Set via NODESTORE_NUM_REPLICAS environment variable.
    #[serde(default)]
    pub num_replicas: u32,
}

fn default_nodes() -> Vec<String> {
    vec!["http://localhost:9200".into()]
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "nodestore/0.1".into()
}

fn default_max_idle_per_host() -> usize {
    50
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_index() -> String {
    "topics".into()
}

fn default_num_shards() -> u32 {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            max_idle_per_host: default_max_idle_per_host(),
            cache_capacity: default_cache_capacity(),
            refresh_on_write: true,
            default_index: default_index(),
            indices: Vec::new(),
            num_shards: default_num_shards(),
            num_replicas: 0,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Settings applied to indices created at startup.
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings { number_of_shards: self.num_shards, number_of_replicas: self.num_replicas }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `NODESTORE_`
    /// 2. TOML file from `NODESTORE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("NODESTORE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("NODESTORE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
