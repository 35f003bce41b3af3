//! Content store backed by the `content:` section of the settings file

use super::{
    Agency, BoostedContent, ContentError, ContentStore, FeaturedCollection, IndexedDocument,
    MedTopic, NewsItem,
};
use crate::tenant::TenantScope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A curated item owned by one tenant and shown for matching queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curated<T> {
    pub tenant: String,
    /// Queries containing any of these phrases match
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub item: T,
}

impl<T> Curated<T> {
    fn matches(&self, query: &str, tenant: &TenantScope, title: &str) -> bool {
        if self.tenant != tenant.id || query.is_empty() {
            return false;
        }
        title.to_lowercase().contains(query)
            || self
                .keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && query.contains(&keyword.to_lowercase()))
    }
}

/// Agency shown when the query is exactly one of its phrases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyPhrases {
    pub phrases: Vec<String>,
    #[serde(flatten)]
    pub agency: Agency,
}

/// Related searches offered for queries containing a keyword
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedSearches {
    pub keyword: String,
    pub terms: Vec<String>,
}

/// In-memory content store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticContentStore {
    pub boosted_contents: Vec<Curated<BoostedContent>>,
    pub featured_collections: Vec<Curated<FeaturedCollection>>,
    pub indexed_documents: Vec<Curated<IndexedDocument>>,
    pub agencies: Vec<AgencyPhrases>,
    pub med_topics: Vec<MedTopic>,
    pub news_items: Vec<NewsItem>,
    pub related_searches: Vec<Curated<RelatedSearches>>,
}

fn normalize(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[async_trait]
impl ContentStore for StaticContentStore {
    async fn boosted_contents(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<BoostedContent>, ContentError> {
        let query = normalize(query);
        Ok(self
            .boosted_contents
            .iter()
            .filter(|c| c.matches(&query, tenant, &c.item.title))
            .map(|c| c.item.clone())
            .collect())
    }

    async fn featured_collections(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<FeaturedCollection>, ContentError> {
        let query = normalize(query);
        Ok(self
            .featured_collections
            .iter()
            .filter(|c| c.matches(&query, tenant, &c.item.title))
            .map(|c| c.item.clone())
            .collect())
    }

    async fn indexed_documents(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<IndexedDocument>, ContentError> {
        let query = normalize(query);
        Ok(self
            .indexed_documents
            .iter()
            .filter(|d| {
                d.matches(&query, tenant, &d.item.title)
                    || (d.tenant == tenant.id
                        && !query.is_empty()
                        && d.item.description.to_lowercase().contains(&query))
            })
            .map(|d| d.item.clone())
            .collect())
    }

    async fn agency_for_phrase(&self, query: &str) -> Result<Option<Agency>, ContentError> {
        let query = normalize(query);
        Ok(self
            .agencies
            .iter()
            .find(|a| a.phrases.iter().any(|p| normalize(p) == query))
            .map(|a| a.agency.clone()))
    }

    async fn med_topic(&self, query: &str, locale: &str) -> Result<Option<MedTopic>, ContentError> {
        let query = normalize(query);
        Ok(self
            .med_topics
            .iter()
            .find(|t| t.locale == locale && normalize(&t.title) == query)
            .cloned())
    }

    async fn news_items(
        &self,
        query: &str,
        feed_ids: &[u64],
        limit: usize,
    ) -> Result<Vec<NewsItem>, ContentError> {
        let query = normalize(query);
        let mut items: Vec<_> = self
            .news_items
            .iter()
            .filter(|item| feed_ids.contains(&item.feed_id))
            .filter(|item| {
                query.is_empty()
                    || item.title.to_lowercase().contains(&query)
                    || item.description.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(limit);
        Ok(items)
    }

    async fn related_searches(
        &self,
        query: &str,
        tenant: &TenantScope,
    ) -> Result<Vec<String>, ContentError> {
        let query = normalize(query);
        Ok(self
            .related_searches
            .iter()
            .filter(|r| r.matches(&query, tenant, &r.item.keyword))
            .flat_map(|r| r.item.terms.iter().cloned())
            .filter(|term| normalize(term) != query)
            .collect())
    }
}
