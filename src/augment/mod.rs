//! Result augmentation
//!
//! Merges tenant-curated content into a search: boosted results, featured
//! collections, indexed documents, agency and health topic boxes, news items
//! and related searches. Curated content lives in an external store reached
//! through [`ContentStore`].

mod store;

pub use store::{Curated, StaticContentStore};

use crate::results::{remove_strong, strip_highlights, NormalizedResult};
use crate::tenant::TenantScope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// News items shown in the news box on web result pages
pub const NEWS_BOX_LIMIT: usize = 3;

/// A result pinned by the tenant for matching queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostedContent {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// A link inside a featured collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturedLink {
    pub title: String,
    pub url: String,
}

/// A curated group of links
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturedCollection {
    pub title: String,
    pub title_url: Option<String>,
    pub links: Vec<FeaturedLink>,
}

/// A document from the tenant's own crawled index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedDocument {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// A government agency matched by query phrase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agency {
    pub name: String,
    pub url: String,
    pub phone: Option<String>,
}

/// A health topic summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedTopic {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub locale: String,
}

/// An item from one of the tenant's news feeds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub feed_id: u64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Content store failures; callers treat them as "nothing found"
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

/// Lookups against tenant-curated content
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn boosted_contents(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<BoostedContent>, ContentError>;

    async fn featured_collections(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<FeaturedCollection>, ContentError>;

    async fn indexed_documents(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<IndexedDocument>, ContentError>;

    async fn agency_for_phrase(&self, query: &str) -> Result<Option<Agency>, ContentError>;

    async fn med_topic(&self, query: &str, locale: &str) -> Result<Option<MedTopic>, ContentError>;

    /// Most recent matching items from `feed_ids`
    async fn news_items(
        &self,
        query: &str,
        feed_ids: &[u64],
        limit: usize,
    ) -> Result<Vec<NewsItem>, ContentError>;

    async fn related_searches(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<String>, ContentError>;
}

/// What the augmenter needs to know about the search
#[derive(Debug, Clone, Copy)]
pub struct AugmentContext<'a> {
    pub query: &'a str,
    pub tenant: &'a TenantScope,
    pub locale: &'a str,
    pub first_page: bool,
    /// Organic results came from the internal index
    pub internal_results: bool,
    /// Related terms reported by the provider
    pub provider_related: &'a [String],
}

/// Curated content found for one search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Augmentation {
    pub boosted_contents: Option<Vec<BoostedContent>>,
    pub featured_collections: Option<Vec<FeaturedCollection>>,
    pub indexed_documents: Option<Vec<IndexedDocument>>,
    pub agency: Option<Agency>,
    pub med_topic: Option<MedTopic>,
    pub news_items: Option<Vec<NewsItem>>,
    pub related_searches: Vec<String>,
}

/// Runs every curated-content lookup for a search
pub struct ResultAugmenter<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> ResultAugmenter<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Look up curated content concurrently. Lookups that fail are logged and
    /// contribute nothing.
    pub async fn augment(&self, ctx: AugmentContext<'_>, results: &[NormalizedResult]) -> Augmentation {
        let store = self.store;
        let tenant = ctx.tenant;
        let query = ctx.query;
        let first_page = ctx.first_page;
        let news_feeds = tenant.govbox_feed_ids();

        let (boosted, featured, indexed, agency, med_topic, news_items, related) = tokio::join!(
            lookup("boosted contents", store.boosted_contents(query, tenant)),
            when(first_page, "featured collections", || {
                store.featured_collections(query, tenant)
            }),
            when(first_page && !ctx.internal_results, "indexed documents", || {
                store.indexed_documents(query, tenant)
            }),
            when(first_page && tenant.agency_govbox_enabled, "agency", || {
                store.agency_for_phrase(query)
            }),
            when(first_page && tenant.medline_govbox_enabled, "med topic", || {
                store.med_topic(query, ctx.locale)
            }),
            when(first_page && !news_feeds.is_empty(), "news items", || {
                store.news_items(query, &news_feeds, NEWS_BOX_LIMIT)
            }),
            lookup("related searches", store.related_searches(query, tenant)),
        );

        let related = match related {
            Some(terms) if !terms.is_empty() => terms,
            _ => ctx.provider_related.to_vec(),
        };

        Augmentation {
            boosted_contents: boosted,
            featured_collections: featured.flatten(),
            indexed_documents: indexed
                .flatten()
                .map(|docs| remove_provider_duplicates(docs, results)),
            agency: agency.flatten().flatten(),
            med_topic: med_topic.flatten().flatten(),
            news_items: news_items.flatten(),
            related_searches: remove_strong(&related),
        }
    }
}

async fn lookup<T, F>(what: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, ContentError>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to look up {}: {}", what, e);
            None
        }
    }
}

async fn when<T, F, Fut>(enabled: bool, what: &str, f: F) -> Option<Option<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ContentError>>,
{
    if enabled {
        Some(lookup(what, f()).await)
    } else {
        None
    }
}

/// Drop indexed documents the provider already returned.
///
/// A document is a duplicate when its path and query match a result's
/// (ignoring one trailing slash) and its title matches the result's title
/// without highlight markers, or when both full URLs match after dropping a
/// trailing slash. Documents whose URL does not parse are kept.
pub fn remove_provider_duplicates(
    documents: Vec<IndexedDocument>,
    results: &[NormalizedResult],
) -> Vec<IndexedDocument> {
    documents
        .into_iter()
        .filter(|doc| !is_provider_duplicate(doc, results))
        .collect()
}

fn is_provider_duplicate(doc: &IndexedDocument, results: &[NormalizedResult]) -> bool {
    let local_url = strip_trailing_slash(&doc.url);
    let Some(local_request_uri) = request_uri(local_url) else {
        return false;
    };

    results.iter().any(|result| {
        let result_url = strip_trailing_slash(&result.url);
        let same_page = request_uri(result_url).as_deref() == Some(local_request_uri.as_str())
            && doc.title == strip_highlights(&result.title);
        same_page || result_url == local_url
    })
}

fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Path plus query, as sent in an HTTP request line
fn request_uri(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(title: &str, url: &str) -> NormalizedResult {
        NormalizedResult {
            title: title.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn doc(title: &str, url: &str) -> IndexedDocument {
        IndexedDocument {
            title: title.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_by_full_url() {
        let kept = remove_provider_duplicates(
            vec![doc("Other title", "http://www.nps.gov/parks/")],
            &[result("Parks", "http://www.nps.gov/parks")],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn test_duplicate_by_request_uri_and_title() {
        let kept = remove_provider_duplicates(
            vec![doc("Parks", "http://nps.gov/parks")],
            &[result("\u{E000}Parks\u{E001}", "https://www.nps.gov/parks/")],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn test_same_path_different_title_kept() {
        let kept = remove_provider_duplicates(
            vec![doc("Parks and Recreation", "http://nps.gov/parks")],
            &[result("Parks", "https://www.nps.gov/parks")],
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_unparseable_document_kept() {
        let kept = remove_provider_duplicates(
            vec![doc("Parks", "not a url")],
            &[result("Parks", "not a url")],
        );
        assert_eq!(kept.len(), 1);
    }

    /// Store that records how many lookups ran and returns one of everything
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        fail_boosted: bool,
    }

    impl CountingStore {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ContentStore for CountingStore {
        async fn boosted_contents(&self, _q: &str, _t: &TenantScope) -> Result<Vec<BoostedContent>, ContentError> {
            self.hit();
            if self.fail_boosted {
                return Err(ContentError::Unavailable("down".into()));
            }
            Ok(vec![BoostedContent::default()])
        }

        async fn featured_collections(&self, _q: &str, _t: &TenantScope) -> Result<Vec<FeaturedCollection>, ContentError> {
            self.hit();
            Ok(vec![FeaturedCollection::default()])
        }

        async fn indexed_documents(&self, _q: &str, _t: &TenantScope) -> Result<Vec<IndexedDocument>, ContentError> {
            self.hit();
            Ok(vec![doc("Dup", "http://a.gov/x"), doc("Keep", "http://a.gov/y")])
        }

        async fn agency_for_phrase(&self, _q: &str) -> Result<Option<Agency>, ContentError> {
            self.hit();
            Ok(Some(Agency::default()))
        }

        async fn med_topic(&self, _q: &str, _l: &str) -> Result<Option<MedTopic>, ContentError> {
            self.hit();
            Ok(Some(MedTopic::default()))
        }

        async fn news_items(&self, _q: &str, _f: &[u64], _l: usize) -> Result<Vec<NewsItem>, ContentError> {
            self.hit();
            Ok(vec![NewsItem::default()])
        }

        async fn related_searches(&self, _q: &str, _t: &TenantScope) -> Result<Vec<String>, ContentError> {
            self.hit();
            Ok(vec!["<strong>flu</strong> shots".to_string()])
        }
    }

    fn tenant() -> TenantScope {
        let mut tenant = TenantScope::new("t");
        tenant.agency_govbox_enabled = true;
        tenant.medline_govbox_enabled = true;
        tenant.news_feeds.push(crate::tenant::NewsFeed {
            id: 1,
            govbox_enabled: true,
            ..Default::default()
        });
        tenant
    }

    fn ctx<'a>(tenant: &'a TenantScope, first_page: bool, internal: bool) -> AugmentContext<'a> {
        AugmentContext {
            query: "flu",
            tenant,
            locale: "en",
            first_page,
            internal_results: internal,
            provider_related: &[],
        }
    }

    #[tokio::test]
    async fn test_first_page_runs_everything() {
        let store = CountingStore::default();
        let tenant = tenant();
        let augmentation = ResultAugmenter::new(&store)
            .augment(ctx(&tenant, true, false), &[result("Dup", "http://a.gov/x")])
            .await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 7);
        assert_eq!(augmentation.indexed_documents.as_ref().map(Vec::len), Some(1));
        assert!(augmentation.agency.is_some());
        assert!(augmentation.med_topic.is_some());
        assert_eq!(augmentation.related_searches, vec!["flu shots"]);
    }

    #[tokio::test]
    async fn test_later_pages_only_boosted_and_related() {
        let store = CountingStore::default();
        let tenant = tenant();
        let augmentation = ResultAugmenter::new(&store)
            .augment(ctx(&tenant, false, false), &[])
            .await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert!(augmentation.boosted_contents.is_some());
        assert!(augmentation.featured_collections.is_none());
        assert!(augmentation.news_items.is_none());
    }

    #[tokio::test]
    async fn test_internal_results_skip_indexed_documents() {
        let store = CountingStore::default();
        let tenant = tenant();
        let augmentation = ResultAugmenter::new(&store)
            .augment(ctx(&tenant, true, true), &[])
            .await;
        assert!(augmentation.indexed_documents.is_none());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_nothing_found() {
        let store = CountingStore {
            fail_boosted: true,
            ..Default::default()
        };
        let tenant = tenant();
        let augmentation = ResultAugmenter::new(&store)
            .augment(ctx(&tenant, true, false), &[])
            .await;
        assert!(augmentation.boosted_contents.is_none());
        assert!(augmentation.featured_collections.is_some());
    }
}
