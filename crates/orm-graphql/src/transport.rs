//! The transport collaborator: anything that can take a prepared operation
//! and return raw GraphQL response data.

use std::{collections::HashMap, fmt, sync::Mutex};

use async_trait::async_trait;
use itertools::Itertools as _;
use reqwest::header::USER_AGENT;
use serde_json::{Map, Value};
use url::Url;

use crate::query::{OperationKind, PreparedOperation};

/// Per-call cache-control hint. The adapter core never caches; the hint is
/// passed through for the transport's cache policy to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Default,
    Bypass,
}

/// One error entry of a GraphQL response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("could not complete request to GraphQL server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL server returned errors: {}", .0.iter().format(", "))]
    Graphql(Vec<GraphqlError>),

    #[error("could not find valid data in GraphQL response")]
    MissingData,
}

#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Executes one operation and returns the raw `data` payload.
    async fn execute(
        &self,
        operation: &PreparedOperation,
        cache: CachePolicy,
    ) -> Result<Value, TransportError>;
}

#[derive(serde::Serialize)]
struct Request<'a> {
    query: &'a str,
    #[serde(rename = "operationName")]
    operation_name: &'a str,
    variables: &'a Map<String, Value>,
}

#[derive(serde::Deserialize)]
struct Response {
    data: Option<Value>,
    errors: Option<Vec<GraphqlError>>,
}

/// `reqwest`-backed transport with a full-response memory cache for query
/// operations. Mutations are never cached; `CachePolicy::Bypass` skips the
/// cache lookup but still stores the fresh response.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    headers: Vec<(String, String)>,
    cache: Mutex<HashMap<CacheKey, Value>>,
}

type CacheKey = (String, String);

impl HttpTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            headers: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Adds an HTTP header to every outgoing request, e.g. for
    /// authentication.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn cache_key(operation: &PreparedOperation) -> CacheKey {
        (
            operation.query.clone(),
            serde_json::to_string(&operation.variables).unwrap_or_default(),
        )
    }

    fn cached(&self, key: &CacheKey) -> Option<Value> {
        self.cache.lock().ok().and_then(|cache| cache.get(key).cloned())
    }

    fn remember(&self, key: CacheKey, data: &Value) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, data.clone());
        }
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn execute(
        &self,
        operation: &PreparedOperation,
        cache: CachePolicy,
    ) -> Result<Value, TransportError> {
        let cacheable = operation.kind == OperationKind::Query;
        let key = Self::cache_key(operation);

        if cacheable && cache != CachePolicy::Bypass {
            if let Some(hit) = self.cached(&key) {
                tracing::debug!(operation = %operation.operation_name, "serving from response cache");
                return Ok(hit);
            }
        }

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(USER_AGENT, "orm-graphql");
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        let response: Response = builder
            .json(&Request {
                query: &operation.query,
                operation_name: &operation.operation_name,
                variables: &operation.variables,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(errors) = response.errors {
            if !errors.is_empty() {
                return Err(TransportError::Graphql(errors));
            }
        }

        let data = response.data.ok_or(TransportError::MissingData)?;
        if cacheable {
            self.remember(key, &data);
        }
        Ok(data)
    }
}
