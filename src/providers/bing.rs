//! Bing v7 search provider

use super::traits::*;
use crate::config::ProviderConfig;
use crate::results::{DeepLink, ProviderResponse, RawResult};
use crate::search::{FilterSetting, Vertical};
use serde::Deserialize;

/// Subscription key header
pub const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Bing web and image search
pub struct Bing {
    web_url: String,
    image_url: String,
    web_key: Option<String>,
    image_key: Option<String>,
}

impl Bing {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            web_url: config.web_url.clone(),
            image_url: config.image_url.clone(),
            web_key: config.api_key.clone(),
            image_key: config.image_api_key.clone().or_else(|| config.api_key.clone()),
        }
    }

    fn safe_search(filter: FilterSetting) -> &'static str {
        match filter {
            FilterSetting::Off => "Off",
            FilterSetting::Low | FilterSetting::Medium => "Moderate",
            FilterSetting::High => "Strict",
        }
    }

    /// Bing market for a locale (`es` -> `es-US`)
    fn market(locale: &str) -> String {
        let language = locale.split(['-', '_']).next().unwrap_or("en");
        format!("{}-US", language.to_lowercase())
    }

    fn decode_web(query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        let payload: WebPayload = serde_json::from_str(body)?;
        let pages = payload.web_pages.unwrap_or_default();

        // An estimate without any results counts as zero hits
        let (total, offset) = if pages.value.is_empty() {
            (0, 0)
        } else {
            (
                pages.total_estimated_matches.unwrap_or(0),
                pages.offset.unwrap_or(query.offset),
            )
        };

        Ok(ProviderResponse {
            total,
            offset,
            results: pages.value.into_iter().map(RawResult::from).collect(),
            spelling_suggestion: payload.query_context.and_then(|c| c.altered_query),
            related_terms: payload
                .related_searches
                .map(|r| r.value.into_iter().filter_map(|v| v.text).collect())
                .unwrap_or_default(),
        })
    }

    fn decode_images(query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        let payload: ImagePayload = serde_json::from_str(body)?;

        Ok(ProviderResponse {
            total: payload.total_estimated_matches.unwrap_or(0),
            offset: query.offset,
            results: payload.value.into_iter().map(RawResult::from).collect(),
            spelling_suggestion: payload.query_context.and_then(|c| c.altered_query),
            related_terms: Vec::new(),
        })
    }
}

impl Provider for Bing {
    fn name(&self) -> &str {
        "bing"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Bing
    }

    fn sources(&self, vertical: Vertical) -> &'static str {
        match vertical {
            Vertical::Image => "Image",
            _ => "Spell+Web",
        }
    }

    fn request(&self, query: &ProviderQuery) -> Result<OutboundRequest, ProviderError> {
        let (url, key) = match query.vertical {
            Vertical::Web => (&self.web_url, &self.web_key),
            Vertical::Image => (&self.image_url, &self.image_key),
            Vertical::News => return Err(ProviderError::UnsupportedVertical(Vertical::News)),
        };

        let mut request = OutboundRequest::get(url)
            .param("q", &query.formatted_query)
            .param("count", query.per_page)
            .param("offset", query.offset)
            .param("mkt", Self::market(&query.locale))
            .param("safeSearch", Self::safe_search(query.filter_setting));

        if query.vertical == Vertical::Web {
            request = request
                .param("textDecorations", query.enable_highlighting)
                .param("textFormat", "Raw");
        }

        if let Some(key) = key {
            request = request.header(SUBSCRIPTION_HEADER, key);
        }

        Ok(request)
    }

    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        match query.vertical {
            Vertical::Web => Self::decode_web(query, body),
            Vertical::Image => Self::decode_images(query, body),
            Vertical::News => Err(ProviderError::UnsupportedVertical(Vertical::News)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPayload {
    web_pages: Option<WebPages>,
    query_context: Option<QueryContext>,
    related_searches: Option<RelatedSearches>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPages {
    total_estimated_matches: Option<u64>,
    offset: Option<u64>,
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPage {
    name: Option<String>,
    url: Option<String>,
    display_url: Option<String>,
    snippet: Option<String>,
    deep_links: Option<Vec<BingDeepLink>>,
}

#[derive(Debug, Deserialize)]
struct BingDeepLink {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryContext {
    altered_query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelatedSearches {
    #[serde(default)]
    value: Vec<RelatedSearch>,
}

#[derive(Debug, Deserialize)]
struct RelatedSearch {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePayload {
    total_estimated_matches: Option<u64>,
    query_context: Option<QueryContext>,
    #[serde(default)]
    value: Vec<Image>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    name: Option<String>,
    host_page_url: Option<String>,
    host_page_display_url: Option<String>,
    content_url: Option<String>,
    thumbnail_url: Option<String>,
}

impl From<WebPage> for RawResult {
    fn from(page: WebPage) -> Self {
        let deep_links = page.deep_links.map(|links| {
            links
                .into_iter()
                .filter_map(|l| {
                    Some(DeepLink {
                        title: l.name?,
                        url: l.url?,
                    })
                })
                .collect()
        });

        RawResult {
            title: page.name,
            url: page.url,
            display_url: page.display_url,
            description: page.snippet,
            deep_links,
            ..Default::default()
        }
    }
}

impl From<Image> for RawResult {
    fn from(image: Image) -> Self {
        RawResult {
            title: image.name,
            url: image.host_page_url,
            display_url: image.host_page_display_url,
            cache_url: image.content_url,
            thumbnail: image.thumbnail_url,
            ..Default::default()
        }
    }
}
