//! Provider traits and types

use crate::cache::CacheKey;
use crate::results::ProviderResponse;
use crate::search::{DateRange, ErrorKind, FilterSetting, Vertical};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which upstream a provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Bing,
    Google,
    InternalIndex,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bing => "bing",
            Self::Google => "google",
            Self::InternalIndex => "internal_index",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a provider needs to build one request
#[derive(Debug, Clone, Default)]
pub struct ProviderQuery {
    /// Query plus locale and tenant scope, for external providers
    pub formatted_query: String,
    /// User query without tenant scope, for the internal index
    pub query: String,
    pub vertical: Vertical,
    pub offset: u64,
    pub page: u32,
    pub per_page: u32,
    pub filter_setting: FilterSetting,
    pub enable_highlighting: bool,
    pub locale: String,
    pub tenant_id: String,
    /// News feed restriction
    pub channel: Option<u64>,
    pub date_range: Option<DateRange>,
    pub sort_by_relevance: bool,
    /// News feeds searched when no channel is given
    pub feeds: Vec<u64>,
}

/// HTTP request to be made for a provider
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters, in order
    pub params: Vec<(String, String)>,
    /// JSON body for POST requests
    pub body: Option<serde_json::Value>,
}

impl OutboundRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            params: Vec::new(),
            body: None,
        }
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter when a value is present
    pub fn param_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Add JSON body
    pub fn json(mut self, data: serde_json::Value) -> Self {
        self.body = Some(data);
        self
    }

    /// Value of a query parameter
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP response from a provider request
#[derive(Debug)]
pub struct OutboundResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body as text
    pub text: String,
    /// Response URL (after redirects)
    pub url: String,
}

impl OutboundResponse {
    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Provider failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure (connection refused, DNS, TLS, ...)
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider timed out")]
    Timeout,
    /// Non-2xx response
    #[error("provider returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("malformed provider payload: {0}")]
    MalformedPayload(String),
    #[error("provider does not serve the {0} vertical")]
    UnsupportedVertical(Vertical),
    /// Request could not be built (missing endpoint, bad configuration)
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedPayload(_) => ErrorKind::MalformedProviderPayload,
            _ => ErrorKind::ProviderUnavailable,
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

/// Per-provider adapter: builds requests and decodes payloads.
///
/// Adapters do no I/O; [`super::HttpProvider`] runs them over HTTP.
pub trait Provider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Verticals this provider serves
    fn verticals(&self) -> &[Vertical] {
        &[Vertical::Web, Vertical::Image]
    }

    /// Default timeout in seconds
    fn timeout(&self) -> f64 {
        crate::DEFAULT_TIMEOUT
    }

    /// Source label used in cache keys
    fn sources(&self, vertical: Vertical) -> &'static str;

    /// Cache key for a query against this provider
    fn cache_key(&self, query: &ProviderQuery) -> CacheKey {
        CacheKey::provider(
            &query.formatted_query,
            self.sources(query.vertical),
            query.offset,
            query.per_page,
            query.enable_highlighting,
            query.filter_setting,
        )
    }

    /// Build the HTTP request for a search
    fn request(&self, query: &ProviderQuery) -> Result<OutboundRequest, ProviderError>;

    /// Decode a response body
    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError>;

    fn supports(&self, vertical: Vertical) -> bool {
        self.verticals().contains(&vertical)
    }
}

/// Provider as seen by the search orchestrator
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn supports(&self, vertical: Vertical) -> bool;

    fn cache_key(&self, query: &ProviderQuery) -> CacheKey;

    /// Fetch the raw response body
    async fn fetch(&self, query: &ProviderQuery) -> Result<String, ProviderError>;

    /// Decode a raw body, fetched or cached
    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError>;

    /// Fetch and decode
    async fn execute(&self, query: &ProviderQuery) -> Result<ProviderResponse, ProviderError> {
        let body = self.fetch(query).await?;
        self.decode(query, &body)
    }
}

/// Effective timeout: configured value, else provider default, capped
pub fn effective_timeout(configured: Option<f64>, provider_default: f64) -> Duration {
    let secs = configured
        .unwrap_or(provider_default)
        .clamp(0.001, crate::MAX_TIMEOUT);
    Duration::from_secs_f64(secs)
}
