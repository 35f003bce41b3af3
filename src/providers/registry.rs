//! Provider registry and per-tenant strategy selection

use super::traits::{ProviderClient, ProviderKind};
use crate::search::Vertical;
use crate::tenant::{TenantScope, WebProvider};
use std::collections::HashMap;
use std::sync::Arc;

/// The configured provider clients
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn ProviderClient>>,
}

impl ProviderSet {
    /// Create a new empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, replacing any client of the same kind
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.providers.insert(client.kind(), client);
    }

    /// Builder-style [`Self::register`]
    pub fn with(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.register(client);
        self
    }

    /// Get a client by kind
    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderClient>> {
        self.providers.get(&kind)
    }

    pub fn internal_index(&self) -> Option<&Arc<dyn ProviderClient>> {
        self.get(ProviderKind::InternalIndex)
    }

    /// Primary provider for a tenant and vertical.
    ///
    /// News always comes from the internal index. Web and image follow the
    /// tenant's provider, falling back to the internal index when that
    /// provider is not configured and the tenant has one.
    pub fn select(&self, tenant: &TenantScope, vertical: Vertical) -> Option<Arc<dyn ProviderClient>> {
        let preferred = match vertical {
            Vertical::News => ProviderKind::InternalIndex,
            _ => match tenant.web_provider {
                WebProvider::Bing => ProviderKind::Bing,
                WebProvider::Google => ProviderKind::Google,
                WebProvider::InternalIndex => ProviderKind::InternalIndex,
            },
        };

        self.get(preferred)
            .filter(|client| client.supports(vertical))
            .or_else(|| self.fallback(tenant, preferred, vertical))
            .cloned()
    }

    /// Internal index fallback after `failed` could not serve the request
    pub fn fallback(
        &self,
        tenant: &TenantScope,
        failed: ProviderKind,
        vertical: Vertical,
    ) -> Option<&Arc<dyn ProviderClient>> {
        if !tenant.uses_internal_index || failed == ProviderKind::InternalIndex {
            return None;
        }
        self.internal_index().filter(|client| client.supports(vertical))
    }

    /// Internal index consulted when `primary` answered a web search with no
    /// hits. Applies to every tenant.
    pub fn zero_hits_fallback(
        &self,
        primary: ProviderKind,
        vertical: Vertical,
    ) -> Option<&Arc<dyn ProviderClient>> {
        if vertical != Vertical::Web || primary == ProviderKind::InternalIndex {
            return None;
        }
        self.internal_index().filter(|client| client.supports(vertical))
    }

    /// Get all provider names
    pub fn names(&self) -> Vec<&str> {
        self.providers.values().map(|p| p.name()).collect()
    }

    /// Get number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::providers::{ProviderError, ProviderQuery};
    use crate::results::ProviderResponse;
    use async_trait::async_trait;

    struct Stub(ProviderKind, &'static [Vertical]);

    #[async_trait]
    impl ProviderClient for Stub {
        fn name(&self) -> &str {
            self.0.as_str()
        }

        fn kind(&self) -> ProviderKind {
            self.0
        }

        fn supports(&self, vertical: Vertical) -> bool {
            self.1.contains(&vertical)
        }

        fn cache_key(&self, _query: &ProviderQuery) -> CacheKey {
            CacheKey::internal(Vertical::Web, "", "", 1, 10)
        }

        async fn fetch(&self, _query: &ProviderQuery) -> Result<String, ProviderError> {
            Ok(String::new())
        }

        fn decode(&self, _query: &ProviderQuery, _body: &str) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse::default())
        }
    }

    const ALL: &[Vertical] = &[Vertical::Web, Vertical::Image, Vertical::News];
    const WEB_IMAGE: &[Vertical] = &[Vertical::Web, Vertical::Image];

    fn set() -> ProviderSet {
        ProviderSet::new()
            .with(Arc::new(Stub(ProviderKind::Bing, WEB_IMAGE)))
            .with(Arc::new(Stub(ProviderKind::InternalIndex, ALL)))
    }

    #[test]
    fn test_select_follows_tenant() {
        let tenant = TenantScope::new("t");
        let set = set();

        assert_eq!(set.select(&tenant, Vertical::Web).unwrap().kind(), ProviderKind::Bing);
        assert_eq!(
            set.select(&tenant, Vertical::News).unwrap().kind(),
            ProviderKind::InternalIndex
        );

        let internal = TenantScope::new("t").with_provider(WebProvider::InternalIndex);
        assert_eq!(
            set.select(&internal, Vertical::Image).unwrap().kind(),
            ProviderKind::InternalIndex
        );
    }

    #[test]
    fn test_missing_provider_falls_back_only_with_internal_index() {
        let set = set();
        let google = TenantScope::new("t").with_provider(WebProvider::Google);
        assert!(set.select(&google, Vertical::Web).is_none());

        let google = google.with_internal_index(true);
        assert_eq!(
            set.select(&google, Vertical::Web).unwrap().kind(),
            ProviderKind::InternalIndex
        );
    }

    #[test]
    fn test_fallback_rules() {
        let set = set();
        let tenant = TenantScope::new("t").with_internal_index(true);

        assert!(set.fallback(&tenant, ProviderKind::Bing, Vertical::Web).is_some());
        assert!(set
            .fallback(&tenant, ProviderKind::InternalIndex, Vertical::Web)
            .is_none());
        assert!(set
            .fallback(&TenantScope::new("t"), ProviderKind::Bing, Vertical::Web)
            .is_none());
    }

    #[test]
    fn test_zero_hits_fallback_ignores_tenant_flag() {
        let set = set();
        assert_eq!(
            set.zero_hits_fallback(ProviderKind::Bing, Vertical::Web)
                .unwrap()
                .kind(),
            ProviderKind::InternalIndex
        );
        assert!(set
            .zero_hits_fallback(ProviderKind::Bing, Vertical::Image)
            .is_none());
        assert!(set
            .zero_hits_fallback(ProviderKind::InternalIndex, Vertical::Web)
            .is_none());
        assert!(ProviderSet::new()
            .with(Arc::new(Stub(ProviderKind::Bing, WEB_IMAGE)))
            .zero_hits_fallback(ProviderKind::Bing, Vertical::Web)
            .is_none());
    }
}
