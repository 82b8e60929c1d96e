//! Client code for nodestore.
//!
//! This crate provides the HTTP implementation of the document backend,
//! speaking the Elasticsearch-compatible REST API.

pub mod elastic;

pub use elastic::{ElasticBackend, ElasticConfig, ElasticError};
