//! Core types and shared functionality for nodestore.
//!
//! This crate provides:
//! - The document model and version field helpers
//! - A bounded recency cache for freshly written documents
//! - Batch result aggregation for multi-get and multi-search envelopes
//! - Optimistic concurrency checks against the last known version
//! - The document operations facade routed through all of the above
//! - Unified error types and layered configuration

pub mod aggregate;
pub mod backend;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod occ;
pub mod ops;
pub mod provision;

pub use backend::{DocumentBackend, IndexSettings, MemoryBackend};
pub use cache::{DocumentCache, LruDocumentCache};
pub use config::{AppConfig, ConfigError, IndexConfig};
pub use document::{Document, VERSION_PROPERTY};
pub use error::Error;
pub use occ::{VersionCheck, VersionCoordinator};
pub use ops::{DocumentClient, Reported};
