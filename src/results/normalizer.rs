//! Provider response normalization
//!
//! Maps provider payloads to [`NormalizedResult`]s, dropping untitled and
//! excluded results, and cleans up the provider's spelling and related-search
//! markup.

use super::types::{NormalizedResult, ProviderResponse, RawResult};
use crate::tenant::TenantScope;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

/// Highlight markers providers wrap around matched terms
pub const HIGHLIGHT_START: char = '\u{E000}';
pub const HIGHLIGHT_END: char = '\u{E001}';

static STRONG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?strong>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalizes provider responses for one tenant
pub struct ResponseNormalizer<'a> {
    tenant: &'a TenantScope,
    excluded_domains: &'a [String],
}

impl<'a> ResponseNormalizer<'a> {
    /// `excluded_domains` applies to every tenant, on top of the tenant's own
    pub fn new(tenant: &'a TenantScope, excluded_domains: &'a [String]) -> Self {
        Self {
            tenant,
            excluded_domains,
        }
    }

    /// Normalize every result in the response. Never aborts the batch; a
    /// result that cannot be mapped is dropped on its own.
    pub fn normalize(&self, response: &ProviderResponse) -> Vec<NormalizedResult> {
        let normalized: Vec<_> = response
            .results
            .iter()
            .filter_map(|raw| self.normalize_one(raw))
            .collect();

        let dropped = response.results.len() - normalized.len();
        if dropped > 0 {
            debug!(
                "Dropped {} of {} results for tenant {}",
                dropped,
                response.results.len(),
                self.tenant.id
            );
        }

        normalized
    }

    fn normalize_one(&self, raw: &RawResult) -> Option<NormalizedResult> {
        let title = raw.title.as_deref().map(str::trim).unwrap_or_default();
        let url = raw.url.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || url.is_empty() || self.url_is_excluded(url) {
            return None;
        }

        Some(NormalizedResult {
            title: title.to_string(),
            url: url.to_string(),
            display_url: raw
                .display_url
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(url)
                .to_string(),
            content: raw.description.clone().unwrap_or_default(),
            cache_url: raw.cache_url.clone(),
            deep_links: raw.deep_links.clone(),
            thumbnail: raw.thumbnail.clone(),
            published_at: raw.published_at,
        })
    }

    /// A URL is excluded when its host ends with an excluded domain, or when
    /// it exactly matches one of the tenant's excluded URLs. URLs that do not
    /// parse are only checked against the exact list.
    pub fn url_is_excluded(&self, url: &str) -> bool {
        if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
            let excluded = self
                .excluded_domains
                .iter()
                .chain(self.tenant.excluded_domains.iter())
                .filter(|domain| !domain.is_empty())
                .any(|domain| host.ends_with(&domain.to_lowercase()));
            if excluded {
                return true;
            }
        }
        self.tenant.excluded_urls.contains(url)
    }
}

/// Remove provider highlight markers
pub fn strip_highlights(text: &str) -> String {
    text.chars()
        .filter(|c| *c != HIGHLIGHT_START && *c != HIGHLIGHT_END)
        .collect()
}

/// Remove `<strong>` markup from related searches
pub fn remove_strong(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|term| STRONG_TAG.replace_all(term, "").to_string())
        .collect()
}

/// Clean a provider's "did you mean" suggestion.
///
/// The scope clause, parentheses, highlight markers and hyphens are removed.
/// Returns `None` when nothing is left or when the suggestion just repeats
/// the user's query.
pub fn clean_spelling_suggestion(suggestion: Option<&str>, query: &str) -> Option<String> {
    let cleaned = strip_extra_chars(suggestion?);
    if cleaned.is_empty() || cleaned == strip_extra_chars(query) {
        return None;
    }
    Some(cleaned)
}

fn strip_extra_chars(text: &str) -> String {
    let head = text.split(" (scopeid").next().unwrap_or_default();
    let stripped: String = strip_highlights(head)
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '-'))
        .collect();
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}
