//! Elasticsearch REST backend.
//!
//! Implements [`DocumentBackend`] over the Elasticsearch-compatible HTTP
//! API with typeless document endpoints.
//!
//! ### Endpoints
//!
//! - **Documents**: `/{index}/_doc/{id}` (PUT, GET, DELETE), `/{index}/_update/{id}`
//! - **Batches**: `/{index}/_mget`, `/{index}/_msearch` (NDJSON)
//! - **Queries**: `/{index}/_search`, `/{index}/_count`
//! - **Admin**: `/_refresh`, `HEAD /{index}`, `PUT /{index}`, `/{index}/_mapping`
//!
//! ### Behavior
//!
//! - Index names and ids are percent-encoded as single path segments.
//! - Requests rotate across the configured nodes.
//! - A get or delete answering 404 is a normal outcome, not an error.
//! - Writes request `refresh=true` when `refresh_on_write` is set.
//! - No retries: every failure is returned to the caller.

pub mod error;
pub mod request;

pub use error::ElasticError;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nodestore_core::{AppConfig, Document, DocumentBackend, IndexSettings};
use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use serde_json::Value;
use url::Url;

/// Default backend node.
const DEFAULT_NODE: &str = "http://localhost:9200";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "nodestore/0.1";

/// Default idle connections kept per node.
const DEFAULT_MAX_IDLE_PER_HOST: usize = 50;

/// Elasticsearch backend configuration.
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URLs of the cluster nodes (default: http://localhost:9200).
    pub nodes: Vec<Url>,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: nodestore/0.x).
    pub user_agent: String,
    /// Idle connections kept per node (default: 50).
    pub max_idle_per_host: usize,
    /// Ask for an immediate refresh on writes (default: true).
    pub refresh_on_write: bool,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            nodes: Url::parse(DEFAULT_NODE).into_iter().collect(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
            refresh_on_write: true,
        }
    }
}

impl ElasticConfig {
    /// Build the backend configuration from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ElasticError> {
        let nodes = config
            .nodes
            .iter()
            .map(|node| {
                Url::parse(node).map_err(|e| ElasticError::InvalidNode { url: node.clone(), reason: e.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            nodes,
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            max_idle_per_host: config.max_idle_per_host,
            refresh_on_write: config.refresh_on_write,
        })
    }
}

/// Elasticsearch REST backend.
#[derive(Debug)]
pub struct ElasticBackend {
    http: reqwest::Client,
    config: ElasticConfig,
    next_node: AtomicUsize,
}

impl ElasticBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: ElasticConfig) -> Result<Self, ElasticError> {
        if config.nodes.is_empty() {
            return Err(ElasticError::NoNodes);
        }
        if let Some(node) = config.nodes.iter().find(|n| n.cannot_be_a_base()) {
            return Err(ElasticError::InvalidNode { url: node.to_string(), reason: "cannot be a base URL".into() });
        }

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .use_rustls_tls()
            .gzip(true)
            .build()?;

        Ok(Self { http, config, next_node: AtomicUsize::new(0) })
    }

    /// Create a backend from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ElasticError> {
        Self::new(ElasticConfig::from_app_config(config)?)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    /// URL for `segments` on the next node in rotation.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let slot = self.next_node.fetch_add(1, Ordering::Relaxed) % self.config.nodes.len();
        let mut url = self.config.nodes[slot].clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(segments))
            .header(header::ACCEPT, "application/json")
    }

    fn with_refresh(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.refresh_on_write { request.query(&[("refresh", "true")]) } else { request }
    }

    /// Send `request`, treating any status outside 2xx and `allowed` as an error.
    async fn send(&self, request: RequestBuilder, allowed: &[StatusCode]) -> Result<Response, ElasticError> {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();

        tracing::debug!(url = %response.url(), %status, elapsed = ?start.elapsed(), "backend response");

        if status.is_success() || allowed.contains(&status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ElasticError::http(status.as_u16(), &body))
    }

    async fn send_json(&self, request: RequestBuilder, allowed: &[StatusCode]) -> Result<Value, ElasticError> {
        let response = self.send(request, allowed).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ElasticError::Parse(e.to_string()))
    }

    /// Take the array stored under `key` in a batch response.
    fn take_array(mut body: Value, key: &str) -> Result<Vec<Value>, ElasticError> {
        match body.get_mut(key).map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ElasticError::Parse(format!("response has no {key} array"))),
        }
    }
}

#[async_trait]
impl DocumentBackend for ElasticBackend {
    async fn put(&self, index: &str, id: &str, doc: &Document) -> Result<(), nodestore_core::Error> {
        let request = self.with_refresh(self.request(Method::PUT, &[index, "_doc", id]).json(doc));
        self.send(request, &[]).await?;
        Ok(())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Value, nodestore_core::Error> {
        let request = self.request(Method::GET, &[index, "_doc", id]);
        Ok(self.send_json(request, &[StatusCode::NOT_FOUND]).await?)
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), nodestore_core::Error> {
        let request = self.with_refresh(self.request(Method::DELETE, &[index, "_doc", id]));
        self.send(request, &[StatusCode::NOT_FOUND]).await?;
        Ok(())
    }

    async fn update(&self, index: &str, id: &str, script: &Value) -> Result<(), nodestore_core::Error> {
        let request = self.with_refresh(self.request(Method::POST, &[index, "_update", id]).json(script));
        self.send(request, &[]).await?;
        Ok(())
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Value>, nodestore_core::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .request(Method::POST, &[index, "_mget"])
            .json(&request::mget_body(ids));
        let body = self.send_json(request, &[]).await?;
        Ok(Self::take_array(body, "docs")?)
    }

    async fn search(&self, index: &str, query: &str) -> Result<Value, nodestore_core::Error> {
        let body = request::compact_query(query)?;
        let request = self
            .request(Method::POST, &[index, "_search"])
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        Ok(self.send_json(request, &[]).await?)
    }

    async fn multi_search(&self, index: &str, queries: &[String]) -> Result<Vec<Value>, nodestore_core::Error> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let body = request::msearch_body(queries)?;
        let request = self
            .request(Method::POST, &[index, "_msearch"])
            .header(header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let body = self.send_json(request, &[]).await?;
        Ok(Self::take_array(body, "responses")?)
    }

    async fn count(&self, index: &str, query: &str) -> Result<u64, nodestore_core::Error> {
        let body = request::compact_query(query)?;
        let request = self
            .request(Method::POST, &[index, "_count"])
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        let body = self.send_json(request, &[]).await?;
        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| ElasticError::Parse("count response has no numeric count".to_string()).into())
    }

    async fn refresh(&self) -> Result<(), nodestore_core::Error> {
        self.send(self.request(Method::POST, &["_refresh"]), &[]).await?;
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, nodestore_core::Error> {
        let response = self
            .send(self.request(Method::HEAD, &[index]), &[StatusCode::NOT_FOUND])
            .await?;
        Ok(response.status() != StatusCode::NOT_FOUND)
    }

    async fn create_index(&self, index: &str, settings: &IndexSettings) -> Result<(), nodestore_core::Error> {
        let request = self
            .request(Method::PUT, &[index])
            .json(&request::settings_body(settings));
        self.send(request, &[]).await?;
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), nodestore_core::Error> {
        let request = self.request(Method::PUT, &[index, "_mapping"]).json(mapping);
        self.send(request, &[]).await?;
        Ok(())
    }
}
