//! Search request, envelope and error models

use super::news::DateRange;
use crate::augment::{Agency, BoostedContent, FeaturedCollection, IndexedDocument, MedTopic, NewsItem};
use crate::config::SearchSettings;
use crate::query::AdvancedQuery;
use crate::results::NormalizedResult;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    #[default]
    Web,
    Image,
    News,
}

impl Vertical {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Image => "image",
            Self::News => "news",
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adult-content filtering level requested of the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetting {
    Off,
    Low,
    #[default]
    Medium,
    High,
}

impl FilterSetting {
    /// Parse a caller-supplied value, accepting both names and the legacy
    /// numeric levels. Anything unrecognized yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "off" | "0" => Some(Self::Off),
            "low" => Some(Self::Low),
            "medium" | "moderate" | "1" => Some(Self::Medium),
            "high" | "strict" | "2" => Some(Self::High),
            _ => None,
        }
    }

    /// Parse or fall back to `default`
    pub fn parse_or(value: Option<&str>, default: Self) -> Self {
        value.and_then(Self::parse).unwrap_or(default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for FilterSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search request as received from the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Tenant handle
    pub tenant: String,
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
    pub filter_setting: FilterSetting,
    pub locale: String,
    pub vertical: Vertical,
    /// News feed the search is restricted to
    pub channel: Option<u64>,
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub advanced: AdvancedQuery,
    pub enable_highlighting: bool,
    /// News results ordered by relevance instead of recency
    pub sort_by_relevance: bool,
    /// Do not record an impression for this search
    pub skip_impressions: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, tenant: impl Into<String>, vertical: Vertical) -> Self {
        Self {
            query: query.into(),
            tenant: tenant.into(),
            page: 1,
            per_page: 10,
            filter_setting: FilterSetting::default(),
            locale: "en".to_string(),
            vertical,
            channel: None,
            date_range: None,
            advanced: AdvancedQuery::default(),
            enable_highlighting: true,
            sort_by_relevance: false,
            skip_impressions: false,
        }
    }

    pub fn web(query: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self::new(query, tenant, Vertical::Web)
    }

    pub fn image(query: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self::new(query, tenant, Vertical::Image)
    }

    pub fn news(query: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self::new(query, tenant, Vertical::News)
    }

    /// Set page number; pages start at 1
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Set page size; zero keeps the current size
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        if per_page > 0 {
            self.per_page = per_page;
        }
        self
    }

    pub fn with_filter(mut self, filter: FilterSetting) -> Self {
        self.filter_setting = filter;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_channel(mut self, channel: u64) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_advanced(mut self, advanced: AdvancedQuery) -> Self {
        self.advanced = advanced;
        self
    }

    pub fn with_highlighting(mut self, enabled: bool) -> Self {
        self.enable_highlighting = enabled;
        self
    }

    /// Zero-based index of the first result on the requested page
    pub fn offset(&self) -> u64 {
        crate::pagination::offset_for(self.page, self.per_page)
    }

    pub fn is_first_page(&self) -> bool {
        self.page <= 1
    }

    /// Apply the builder clamps to a request assembled field by field or
    /// deserialized: page at least 1, a zero page size replaced by the
    /// vertical's default, since/until in order.
    pub fn normalized(mut self, settings: &SearchSettings) -> Self {
        self.page = self.page.max(1);
        if self.per_page == 0 {
            self.per_page = if self.vertical == Vertical::News && self.channel.is_some() {
                settings.news_channel_per_page
            } else {
                settings.default_per_page
            };
        }
        self.date_range = self
            .date_range
            .map(|range| DateRange::new(range.since, range.until));
        self
    }
}

/// Kinds of failure a search can run into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Query rejected before any provider call; the only terminal kind
    InvalidQuery,
    ProviderUnavailable,
    MalformedProviderPayload,
    CacheUnavailable,
}

/// An error attached to a search envelope
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct SearchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SearchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuery, message)
    }
}

/// Uniform result envelope handed back to the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResultEnvelope {
    pub vertical: Vertical,
    pub total: u64,
    /// 1-indexed position of the first result, 0 when there are none
    pub start_record: u64,
    /// 1-indexed position of the last result, 0 when there are none
    pub end_record: u64,
    pub results: Vec<NormalizedResult>,
    pub boosted_results: Option<Vec<BoostedContent>>,
    pub featured_collections: Option<Vec<FeaturedCollection>>,
    pub indexed_documents: Option<Vec<IndexedDocument>>,
    pub news_items: Option<Vec<NewsItem>>,
    pub agency: Option<Agency>,
    pub med_topic: Option<MedTopic>,
    pub related_searches: Vec<String>,
    pub spelling_suggestion: Option<String>,
    pub error: Option<SearchError>,
}

impl SearchResultEnvelope {
    /// Empty envelope carrying an error
    pub fn errored(vertical: Vertical, error: SearchError) -> Self {
        Self {
            vertical,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn has_boosted_contents(&self) -> bool {
        self.boosted_results.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn has_related_searches(&self) -> bool {
        !self.related_searches.is_empty()
    }

    pub fn has_featured_collections(&self) -> bool {
        self.featured_collections.as_ref().is_some_and(|f| !f.is_empty())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    total: u64,
    startrecord: u64,
    endrecord: u64,
    spelling_suggestions: &'a Option<String>,
    related: &'a [String],
    results: &'a [NormalizedResult],
    boosted_results: &'a Option<Vec<BoostedContent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    featured_collections: &'a Option<Vec<FeaturedCollection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexed_documents: &'a Option<Vec<IndexedDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    news_items: &'a Option<Vec<NewsItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agency: &'a Option<Agency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    med_topic: &'a Option<MedTopic>,
}

impl Serialize for SearchResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(ref error) = self.error {
            return ErrorBody {
                error: &error.message,
            }
            .serialize(serializer);
        }

        EnvelopeBody {
            total: self.total,
            startrecord: self.start_record,
            endrecord: self.end_record,
            spelling_suggestions: &self.spelling_suggestion,
            related: &self.related_searches,
            results: &self.results,
            boosted_results: &self.boosted_results,
            featured_collections: &self.featured_collections,
            indexed_documents: &self.indexed_documents,
            news_items: &self.news_items,
            agency: &self.agency,
            med_topic: &self.med_topic,
        }
        .serialize(serializer)
    }
}
