//! Google Custom Search provider

use super::traits::*;
use crate::config::ProviderConfig;
use crate::results::{ProviderResponse, RawResult};
use crate::search::{FilterSetting, Vertical};
use serde::Deserialize;

/// Largest page Google Custom Search returns
const MAX_NUM: u32 = 10;

/// Google Custom Search for web and images
pub struct Google {
    base_url: String,
    api_key: Option<String>,
    engine_id: Option<String>,
}

impl Google {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.web_url.clone(),
            api_key: config.api_key.clone(),
            engine_id: config.engine_id.clone(),
        }
    }

    fn safe(filter: FilterSetting) -> &'static str {
        match filter {
            FilterSetting::Off => "off",
            FilterSetting::Low | FilterSetting::Medium => "medium",
            FilterSetting::High => "high",
        }
    }
}

impl Provider for Google {
    fn name(&self) -> &str {
        "google"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn sources(&self, vertical: Vertical) -> &'static str {
        match vertical {
            Vertical::Image => "Google+Image",
            _ => "Google+Web",
        }
    }

    fn request(&self, query: &ProviderQuery) -> Result<OutboundRequest, ProviderError> {
        if query.vertical == Vertical::News {
            return Err(ProviderError::UnsupportedVertical(Vertical::News));
        }
        let engine_id = self
            .engine_id
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidRequest("missing search engine id".into()))?;

        let mut request = OutboundRequest::get(&self.base_url)
            .param("q", &query.formatted_query)
            .param("cx", engine_id)
            .param_opt("key", self.api_key.as_deref())
            .param("start", query.offset + 1)
            .param("num", query.per_page.min(MAX_NUM))
            .param("safe", Self::safe(query.filter_setting))
            .param("hl", &query.locale);

        if query.vertical == Vertical::Image {
            request = request.param("searchType", "image");
        }

        Ok(request)
    }

    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        let payload: Payload = serde_json::from_str(body)?;
        let total = payload
            .search_information
            .and_then(|info| info.total_results)
            .map(|total| {
                total
                    .parse::<u64>()
                    .map_err(|e| ProviderError::MalformedPayload(format!("totalResults: {}", e)))
            })
            .transpose()?
            .unwrap_or(0);

        Ok(ProviderResponse {
            total,
            offset: query.offset,
            results: payload
                .items
                .into_iter()
                .map(|item| item.into_raw(query.vertical))
                .collect(),
            spelling_suggestion: payload.spelling.and_then(|s| s.corrected_query),
            related_terms: Vec::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    search_information: Option<SearchInformation>,
    spelling: Option<Spelling>,
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInformation {
    /// Sent as a string
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spelling {
    corrected_query: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    title: Option<String>,
    link: Option<String>,
    display_link: Option<String>,
    snippet: Option<String>,
    image: Option<ItemImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemImage {
    context_link: Option<String>,
    thumbnail_link: Option<String>,
}

impl Item {
    fn into_raw(self, vertical: Vertical) -> RawResult {
        match (vertical, self.image) {
            (Vertical::Image, Some(image)) => RawResult {
                title: self.title,
                url: image.context_link.or(self.link.clone()),
                display_url: self.display_link,
                cache_url: self.link,
                thumbnail: image.thumbnail_link,
                ..Default::default()
            },
            _ => RawResult {
                title: self.title,
                url: self.link,
                display_url: self.display_link,
                description: self.snippet,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvidersSettings;

    fn google() -> Google {
        let mut config = ProvidersSettings::default().google;
        config.api_key = Some("key".to_string());
        config.engine_id = Some("1234567890.abc".to_string());
        Google::new(&config)
    }

    fn query(vertical: Vertical, offset: u64, filter: FilterSetting) -> ProviderQuery {
        ProviderQuery {
            formatted_query: "(gov)".to_string(),
            vertical,
            offset,
            per_page: 10,
            filter_setting: filter,
            locale: "en".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_is_one_based() {
        let request = google()
            .request(&query(Vertical::Web, 15, FilterSetting::Medium))
            .unwrap();
        assert_eq!(request.param_value("start"), Some("16"));
        assert_eq!(request.param_value("cx"), Some("1234567890.abc"));
    }

    #[test]
    fn test_filter_levels() {
        for (filter, expected) in [
            (FilterSetting::Off, "off"),
            (FilterSetting::Medium, "medium"),
            (FilterSetting::High, "high"),
        ] {
            let request = google().request(&query(Vertical::Web, 0, filter)).unwrap();
            assert_eq!(request.param_value("safe"), Some(expected));
        }
    }

    #[test]
    fn test_image_search_type() {
        let request = google()
            .request(&query(Vertical::Image, 0, FilterSetting::Medium))
            .unwrap();
        assert_eq!(request.param_value("searchType"), Some("image"));
    }

    #[test]
    fn test_missing_engine_id() {
        let google = Google::new(&ProvidersSettings::default().google);
        let err = google
            .request(&query(Vertical::Web, 0, FilterSetting::Medium))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn test_decode() {
        let body = r#"{
            "searchInformation": {"totalResults": "2350"},
            "spelling": {"correctedQuery": "taxes"},
            "items": [{
                "title": "Using custom google CX",
                "link": "https://www.usa.gov/",
                "displayLink": "www.usa.gov",
                "snippet": "Official guide",
                "cacheId": "abc123"
            }]
        }"#;

        let response = google()
            .decode(&query(Vertical::Web, 0, FilterSetting::Medium), body)
            .unwrap();
        assert_eq!(response.total, 2350);
        assert_eq!(response.results[0].title.as_deref(), Some("Using custom google CX"));
        // cacheId is an opaque token, not a link
        assert_eq!(response.results[0].cache_url, None);
        assert_eq!(response.spelling_suggestion.as_deref(), Some("taxes"));
    }

    #[test]
    fn test_decode_bad_total() {
        let body = r#"{"searchInformation": {"totalResults": "lots"}}"#;
        let err = google()
            .decode(&query(Vertical::Web, 0, FilterSetting::Medium), body)
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_images() {
        let body = r#"{
            "searchInformation": {"totalResults": "1"},
            "items": [{
                "title": "Flag",
                "link": "https://www.usa.gov/flag.jpg",
                "displayLink": "www.usa.gov",
                "image": {
                    "contextLink": "https://www.usa.gov/flag",
                    "thumbnailLink": "https://encrypted-tbn0.gstatic.com/images?q=1"
                }
            }]
        }"#;

        let response = google()
            .decode(&query(Vertical::Image, 0, FilterSetting::Medium), body)
            .unwrap();
        assert_eq!(response.results[0].url.as_deref(), Some("https://www.usa.gov/flag"));
        assert!(response.results[0].thumbnail.is_some());
    }
}
