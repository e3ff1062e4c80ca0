//! Query executor trait and the HTTP subgraph client.

use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use url::Url;

use crate::query::QueryDocument;

/// Cache behavior for one query execution.
///
/// Historical reads are immutable and use [`CachePolicy::CacheFirst`]; feeds
/// expected to change between calls use [`CachePolicy::NoCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve a previously fetched response for an identical document if one
    /// exists, otherwise fetch and remember it.
    CacheFirst,
    /// Always fetch; never store the response.
    NoCache,
}

/// Failure of the query transport itself, as opposed to an entity simply
/// having no data (which surfaces as a `null` field inside a response).
#[derive(Debug)]
pub enum TransportError {
    /// Network or HTTP-level failure.
    Http(reqwest::Error),
    /// The service answered but reported GraphQL errors and returned no data.
    Graph(String),
    /// The response envelope carried no `data` object.
    MissingData,
    /// A response field did not decode into the expected row shape.
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "subgraph request failed: {e}"),
            Self::Graph(msg) => write!(f, "subgraph returned errors: {msg}"),
            Self::MissingData => write!(f, "subgraph response had no data"),
            Self::Decode(msg) => write!(f, "subgraph response did not decode: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Graph(_) | Self::MissingData | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Executes a query document and returns the response `data` object.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute `query` under the given cache policy.
    async fn execute(
        &self,
        query: &QueryDocument,
        policy: CachePolicy,
    ) -> Result<Map<String, Value>, TransportError>;
}

/// Shared executor handle used across the pipeline.
pub type DynExecutor = Arc<dyn QueryExecutor>;

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for Arc<T> {
    async fn execute(
        &self,
        query: &QueryDocument,
        policy: CachePolicy,
    ) -> Result<Map<String, Value>, TransportError> {
        (**self).execute(query, policy).await
    }
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Map<String, Value>>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

/// HTTP client for one GraphQL endpoint.
#[derive(Clone)]
pub struct SubgraphClient {
    http: reqwest::Client,
    url: Url,
    cache: Arc<RwLock<HashMap<String, Map<String, Value>>>>,
}

impl fmt::Debug for SubgraphClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubgraphClient").field("url", &self.url.as_str()).finish_non_exhaustive()
    }
}

impl SubgraphClient {
    /// Create a new client for the endpoint at `url`.
    pub fn new(url: Url) -> Self {
        Self { http: reqwest::Client::new(), url, cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    async fn fetch(&self, query: &QueryDocument) -> Result<Map<String, Value>, TransportError> {
        let body = serde_json::json!({
            "query": query.text,
            "variables": Value::Object(query.variables.clone()),
        });
        let response = self.http.post(self.url.clone()).json(&body).send().await?;
        let envelope = response.error_for_status()?.json::<Envelope>().await?;

        match envelope.data {
            // Partial errors with usable data resolve per-field; the absent
            // fields are null and handled by the callers' not-found paths.
            Some(data) => {
                if !envelope.errors.is_empty() {
                    warn!(
                        query = %query.name,
                        errors = envelope.errors.len(),
                        "subgraph returned partial errors alongside data"
                    );
                }
                Ok(data)
            }
            None if !envelope.errors.is_empty() => {
                let joined = envelope
                    .errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(TransportError::Graph(joined))
            }
            None => Err(TransportError::MissingData),
        }
    }
}

#[async_trait]
impl QueryExecutor for SubgraphClient {
    async fn execute(
        &self,
        query: &QueryDocument,
        policy: CachePolicy,
    ) -> Result<Map<String, Value>, TransportError> {
        let key = query.cache_key();
        if policy == CachePolicy::CacheFirst {
            if let Some(hit) = self.cache.read().await.get(&key) {
                debug!(query = %query.name, "subgraph cache hit");
                return Ok(hit.clone());
            }
        }

        let start = Instant::now();
        let result = self.fetch(query).await;
        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(data) => {
                debug!(query = %query.name, duration_ms, fields = data.len(), "subgraph query executed")
            }
            Err(e) => error!(query = %query.name, duration_ms, error = %e, "subgraph query failed"),
        }

        let data = result?;
        if policy == CachePolicy::CacheFirst {
            self.cache.write().await.insert(key, data.clone());
        }
        Ok(data)
    }
}
