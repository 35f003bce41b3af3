//! Tenant (affiliate) configuration
//!
//! Tenants are owned by an external configuration store; the search core only
//! reads them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where a tenant's organic web and image results come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebProvider {
    #[default]
    Bing,
    Google,
    InternalIndex,
}

/// An RSS feed whose items feed the news vertical
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsFeed {
    pub id: u64,
    pub name: String,
    /// Show items from this feed in the news box on web result pages
    pub govbox_enabled: bool,
}

/// Search scoping rules for one tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantScope {
    /// Tenant handle, unique across the store
    pub id: String,
    pub display_name: String,
    /// Domains searched for this tenant, in priority order
    pub allowed_domains: Vec<String>,
    pub scope_ids: Vec<String>,
    pub scope_keywords: Vec<String>,
    pub excluded_urls: HashSet<String>,
    pub excluded_domains: Vec<String>,
    /// Internal index is available for this tenant (fallback source)
    pub uses_internal_index: bool,
    pub web_provider: WebProvider,
    pub agency_govbox_enabled: bool,
    pub medline_govbox_enabled: bool,
    pub news_feeds: Vec<NewsFeed>,
}

impl TenantScope {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for domain in domains {
            let domain = domain.into().trim().to_lowercase();
            if !domain.is_empty() && !self.allowed_domains.contains(&domain) {
                self.allowed_domains.push(domain);
            }
        }
        self
    }

    pub fn with_scope_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_scope_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn exclude_url(mut self, url: impl Into<String>) -> Self {
        self.excluded_urls.insert(url.into());
        self
    }

    pub fn exclude_domain(mut self, domain: impl Into<String>) -> Self {
        self.excluded_domains.push(domain.into().to_lowercase());
        self
    }

    pub fn with_provider(mut self, provider: WebProvider) -> Self {
        self.web_provider = provider;
        self
    }

    pub fn with_internal_index(mut self, enabled: bool) -> Self {
        self.uses_internal_index = enabled;
        self
    }

    /// Whether `site` is one of the tenant's domains or a subdomain of one
    pub fn includes_domain(&self, site: &str) -> bool {
        let site = site.trim().trim_end_matches('/').to_lowercase();
        if site.is_empty() {
            return false;
        }
        let host = site.split('/').next().unwrap_or_default();
        self.allowed_domains
            .iter()
            .any(|domain| host == domain.as_str() || host.ends_with(&format!(".{}", domain)))
    }

    /// Look up one of this tenant's feeds; feeds of other tenants are not visible
    pub fn news_feed(&self, id: u64) -> Option<&NewsFeed> {
        self.news_feeds.iter().find(|feed| feed.id == id)
    }

    /// Feeds shown in the news box on web result pages
    pub fn govbox_feed_ids(&self) -> Vec<u64> {
        self.news_feeds
            .iter()
            .filter(|feed| feed.govbox_enabled)
            .map(|feed| feed.id)
            .collect()
    }
}

/// Read-only access to tenant configuration
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find(&self, id: &str) -> Option<Arc<TenantScope>>;
}

/// Tenant store backed by the `tenants:` section of the settings file
#[derive(Debug, Default)]
pub struct StaticTenantStore {
    tenants: HashMap<String, Arc<TenantScope>>,
}

impl StaticTenantStore {
    pub fn new(tenants: impl IntoIterator<Item = TenantScope>) -> Self {
        Self {
            tenants: tenants
                .into_iter()
                .map(|tenant| (tenant.id.clone(), Arc::new(tenant)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[async_trait]
impl TenantStore for StaticTenantStore {
    async fn find(&self, id: &str) -> Option<Arc<TenantScope>> {
        self.tenants.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_domain() {
        let tenant = TenantScope::new("usagov").with_domains(["usa.gov", "NPS.gov"]);

        assert!(tenant.includes_domain("usa.gov"));
        assert!(tenant.includes_domain("answers.usa.gov"));
        assert!(tenant.includes_domain("nps.gov/parks"));
        assert!(!tenant.includes_domain("notusa.gov"));
        assert!(!tenant.includes_domain(""));
    }

    #[test]
    fn test_domains_deduplicated_in_order() {
        let tenant = TenantScope::new("t").with_domains(["b.gov", "a.gov", "b.gov"]);
        assert_eq!(tenant.allowed_domains, vec!["b.gov", "a.gov"]);
    }

    #[test]
    fn test_news_feed_lookup() {
        let mut tenant = TenantScope::new("t");
        tenant.news_feeds.push(NewsFeed {
            id: 7,
            name: "Press".to_string(),
            govbox_enabled: true,
        });
        tenant.news_feeds.push(NewsFeed {
            id: 8,
            ..Default::default()
        });

        assert!(tenant.news_feed(7).is_some());
        assert!(tenant.news_feed(99).is_none());
        assert_eq!(tenant.govbox_feed_ids(), vec![7]);
    }

    #[tokio::test]
    async fn test_static_store() {
        let store = StaticTenantStore::new([TenantScope::new("usagov")]);
        assert!(store.find("usagov").await.is_some());
        assert!(store.find("missing").await.is_none());
        assert_eq!(store.len(), 1);
    }
}
