//! Runs a provider adapter over HTTP

use super::traits::{
    effective_timeout, Provider, ProviderClient, ProviderError, ProviderKind, ProviderQuery,
};
use crate::cache::CacheKey;
use crate::network::HttpClient;
use crate::results::ProviderResponse;
use crate::search::Vertical;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Longest error body kept on a status error
const MAX_ERROR_BODY: usize = 512;

/// [`ProviderClient`] for any [`Provider`] adapter
pub struct HttpProvider {
    provider: Arc<dyn Provider>,
    client: HttpClient,
    timeout: Duration,
}

impl HttpProvider {
    pub fn new(provider: Arc<dyn Provider>, client: HttpClient) -> Self {
        let timeout = effective_timeout(None, provider.timeout());
        Self {
            provider,
            client,
            timeout,
        }
    }

    /// Override the provider's default timeout (capped)
    pub fn with_timeout(mut self, seconds: Option<f64>) -> Self {
        self.timeout = effective_timeout(seconds, self.provider.timeout());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ProviderClient for HttpProvider {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    fn supports(&self, vertical: Vertical) -> bool {
        self.provider.supports(vertical)
    }

    fn cache_key(&self, query: &ProviderQuery) -> CacheKey {
        self.provider.cache_key(query)
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<String, ProviderError> {
        if !self.provider.supports(query.vertical) {
            return Err(ProviderError::UnsupportedVertical(query.vertical));
        }

        let request = self.provider.request(query)?;
        debug!("Provider {} requesting {}", self.name(), request.url);

        let response = tokio::time::timeout(
            self.timeout,
            self.client.execute_with_timeout(request, self.timeout),
        )
        .await
        .map_err(|_| ProviderError::Timeout)?
        .map_err(|e| match e.downcast_ref::<reqwest::Error>() {
            Some(err) if err.is_timeout() => ProviderError::Timeout,
            _ => ProviderError::Unavailable(e.to_string()),
        })?;

        if !response.is_success() {
            let mut body = response.text;
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(ProviderError::Status {
                status: response.status,
                body,
            });
        }

        Ok(response.text)
    }

    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        self.provider.decode(query, body)
    }
}
