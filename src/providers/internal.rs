//! Internal index provider
//!
//! Tenant-local document index for web and news results, plus the image
//! index. Queries are sent without the tenant scope clause; the index scopes
//! by tenant id itself.

use super::traits::*;
use crate::cache::CacheKey;
use crate::config::ProviderConfig;
use crate::results::{ProviderResponse, RawResult};
use crate::search::Vertical;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Internal document and image index
pub struct InternalIndex {
    web_url: String,
    image_url: String,
    news_url: Option<String>,
    api_key: Option<String>,
}

impl InternalIndex {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            web_url: config.web_url.clone(),
            image_url: config.image_url.clone(),
            news_url: config.news_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl Provider for InternalIndex {
    fn name(&self) -> &str {
        "internal_index"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::InternalIndex
    }

    fn verticals(&self) -> &[Vertical] {
        if self.news_url.is_some() {
            &[Vertical::Web, Vertical::Image, Vertical::News]
        } else {
            &[Vertical::Web, Vertical::Image]
        }
    }

    fn sources(&self, vertical: Vertical) -> &'static str {
        match vertical {
            Vertical::Web => "odie",
            Vertical::Image => "oasis_image",
            Vertical::News => "news",
        }
    }

    fn cache_key(&self, query: &ProviderQuery) -> CacheKey {
        match query.vertical {
            Vertical::News => CacheKey::news(
                &query.tenant_id,
                &query.query,
                query.channel,
                &query
                    .date_range
                    .map(|range| range.key_fragment())
                    .unwrap_or_default(),
                query.page,
                query.per_page,
            ),
            vertical => CacheKey::internal(
                vertical,
                &query.query,
                &query.tenant_id,
                query.page,
                query.per_page,
            ),
        }
    }

    fn request(&self, query: &ProviderQuery) -> Result<OutboundRequest, ProviderError> {
        let url = match query.vertical {
            Vertical::Web => &self.web_url,
            Vertical::Image => &self.image_url,
            Vertical::News => self
                .news_url
                .as_ref()
                .ok_or(ProviderError::UnsupportedVertical(Vertical::News))?,
        };

        let mut request = OutboundRequest::get(url)
            .param("affiliate", &query.tenant_id)
            .param("query", &query.query)
            .param("page", query.page)
            .param("per_page", query.per_page)
            .param("offset", query.offset)
            .param("locale", &query.locale);

        if query.vertical == Vertical::News {
            let range = query.date_range.unwrap_or_default();
            request = request
                .param_opt("channel", query.channel)
                .param_opt("since", range.since.map(|d| d.to_rfc3339()))
                .param_opt("until", range.until.map(|d| d.to_rfc3339()));
            if query.channel.is_none() && !query.feeds.is_empty() {
                let feeds = query
                    .feeds
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                request = request.param("feeds", feeds);
            }
            if query.sort_by_relevance {
                request = request.param("sort_by", "r");
            }
        }

        if let Some(ref key) = self.api_key {
            request = request.header("X-Api-Key", key);
        }

        Ok(request)
    }

    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        let payload: Payload = serde_json::from_str(body)?;

        Ok(ProviderResponse {
            total: payload.total,
            offset: payload.offset.unwrap_or(query.offset),
            results: payload.results.into_iter().map(RawResult::from).collect(),
            spelling_suggestion: payload.spelling_suggestion,
            related_terms: payload.related,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    total: u64,
    offset: Option<u64>,
    #[serde(default)]
    results: Vec<Document>,
    spelling_suggestion: Option<String>,
    #[serde(default)]
    related: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    title: Option<String>,
    url: Option<String>,
    display_url: Option<String>,
    description: Option<String>,
    thumbnail_url: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

impl From<Document> for RawResult {
    fn from(doc: Document) -> Self {
        RawResult {
            title: doc.title,
            url: doc.url,
            display_url: doc.display_url,
            description: doc.description,
            thumbnail: doc.thumbnail_url,
            published_at: doc.published_at,
            ..Default::default()
        }
    }
}
