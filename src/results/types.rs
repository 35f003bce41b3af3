//! Result type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sub-link shown beneath a web result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    pub title: String,
    pub url: String,
}

/// A single result exactly as a provider returned it.
///
/// Every field is optional; the normalizer applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResult {
    /// Absent or empty titles are dropped during normalization
    pub title: Option<String>,
    /// Absent or empty URLs are dropped during normalization
    pub url: Option<String>,
    /// Falls back to `url`
    pub display_url: Option<String>,
    /// Falls back to an empty snippet
    pub description: Option<String>,
    pub cache_url: Option<String>,
    pub deep_links: Option<Vec<DeepLink>>,
    pub thumbnail: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl RawResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_display_url(mut self, display_url: impl Into<String>) -> Self {
        self.display_url = Some(display_url.into());
        self
    }
}

/// Decoded provider payload, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderResponse {
    /// Provider's estimate of the total number of matches
    pub total: u64,
    /// Zero-based index of the first result in `results`
    pub offset: u64,
    pub results: Vec<RawResult>,
    pub spelling_suggestion: Option<String>,
    pub related_terms: Vec<String>,
}

impl ProviderResponse {
    pub fn empty(offset: u64) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A result in the uniform shape returned to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Never empty
    pub title: String,
    #[serde(rename = "unescapedUrl")]
    pub url: String,
    #[serde(rename = "displayUrl")]
    pub display_url: String,
    pub content: String,
    #[serde(rename = "cacheUrl", skip_serializing_if = "Option::is_none")]
    pub cache_url: Option<String>,
    #[serde(rename = "deepLinks", skip_serializing_if = "Option::is_none")]
    pub deep_links: Option<Vec<DeepLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(rename = "publishedAt", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}
