//! Search orchestration
//!
//! Runs one search request through query building, the response cache, the
//! provider (with internal index fallback), normalization, augmentation,
//! pagination and impression logging.

use super::models::{ErrorKind, SearchError, SearchRequest, SearchResultEnvelope, Vertical};
use crate::analytics::{Impression, ImpressionLogger, ModuleTag, TracingImpressionLogger};
use crate::augment::{AugmentContext, Augmentation, ContentStore, ResultAugmenter};
use crate::cache::{MemoryCache, NullCache, ResponseCache};
use crate::config::{SearchSettings, Settings};
use crate::network::HttpClient;
use crate::pagination::paginate;
use crate::providers::{ProviderClient, ProviderError, ProviderKind, ProviderLoader, ProviderQuery, ProviderSet};
use crate::query::{FormattedQuery, QueryBuilder};
use crate::results::{clean_spelling_suggestion, ProviderResponse, ResponseNormalizer};
use crate::tenant::TenantScope;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Message for queries over the length limit
pub const QUERY_TOO_LONG: &str = "That is too long a search term. Please shorten it and try again.";

/// Message for blank web and image queries
pub const QUERY_BLANK: &str = "Please enter a search term in the box above.";

/// Lifecycle of one search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchState {
    Idle,
    QueryBuilt,
    CacheHit,
    ProviderCalled,
    Normalized,
    Augmented,
    Paginated,
    Logged,
    Done,
    Errored,
}

impl SearchState {
    /// Allowed transitions
    pub fn can_transition_to(self, next: SearchState) -> bool {
        use SearchState::*;
        matches!(
            (self, next),
            (Idle, QueryBuilt)
                | (QueryBuilt, CacheHit)
                | (QueryBuilt, ProviderCalled)
                | (QueryBuilt, Errored)
                | (ProviderCalled, Errored)
                | (CacheHit, Normalized)
                | (ProviderCalled, Normalized)
                | (Normalized, Augmented)
                | (Augmented, Paginated)
                | (Paginated, Logged)
                | (Logged, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SearchState::Done | SearchState::Errored)
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Collaborators shared by every search
#[derive(Clone)]
pub struct SearchServices {
    pub providers: ProviderSet,
    pub cache: Arc<dyn ResponseCache>,
    pub content: Arc<dyn ContentStore>,
    pub impressions: ImpressionLogger,
    pub settings: SearchSettings,
    pub cache_ttl: Duration,
    /// Domains excluded for every tenant
    pub excluded_domains: Vec<String>,
}

impl SearchServices {
    pub fn new(
        providers: ProviderSet,
        cache: Arc<dyn ResponseCache>,
        content: Arc<dyn ContentStore>,
        impressions: ImpressionLogger,
    ) -> Self {
        Self {
            providers,
            cache,
            content,
            impressions,
            settings: SearchSettings::default(),
            cache_ttl: Duration::from_secs(crate::config::CacheSettings::default().ttl_seconds),
            excluded_domains: Vec::new(),
        }
    }

    /// Wire every collaborator from the settings file
    pub fn from_settings(settings: &Settings, client: &HttpClient) -> Self {
        let cache: Arc<dyn ResponseCache> = if settings.cache.enabled {
            Arc::new(MemoryCache::new(settings.cache.max_capacity))
        } else {
            Arc::new(NullCache)
        };

        Self {
            providers: ProviderLoader::load(settings, client),
            cache,
            content: Arc::new(settings.content.clone()),
            impressions: ImpressionLogger::new(Arc::new(TracingImpressionLogger)),
            settings: settings.search.clone(),
            cache_ttl: Duration::from_secs(settings.cache.ttl_seconds),
            excluded_domains: settings.excluded_domains.clone(),
        }
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_excluded_domains(mut self, domains: Vec<String>) -> Self {
        self.excluded_domains = domains;
        self
    }
}

/// Result of running one search
pub struct SearchOutcome {
    pub envelope: SearchResultEnvelope,
    /// Every state the search passed through, starting at `Idle`
    pub states: Vec<SearchState>,
    /// Background impression write, if one was started
    pub impression: Option<JoinHandle<()>>,
}

impl SearchOutcome {
    pub fn final_state(&self) -> SearchState {
        self.states.last().copied().unwrap_or(SearchState::Idle)
    }

    /// Wait for the background impression write
    pub async fn flush(&mut self) {
        if let Some(handle) = self.impression.take() {
            if let Err(e) = handle.await {
                warn!("Impression task failed: {}", e);
            }
        }
    }
}

/// Response that made it through the provider stage
struct Fetched {
    response: ProviderResponse,
    source: Option<ProviderKind>,
}

/// Runs a single search request. One instance per request.
pub struct SearchOrchestrator<'a> {
    services: &'a SearchServices,
    tenant: Arc<TenantScope>,
    request: SearchRequest,
    state: SearchState,
    history: Vec<SearchState>,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(services: &'a SearchServices, tenant: Arc<TenantScope>, request: SearchRequest) -> Self {
        Self {
            services,
            tenant,
            request: request.normalized(&services.settings),
            state: SearchState::Idle,
            history: vec![SearchState::Idle],
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    fn transition(&mut self, next: SearchState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid search transition {} -> {}",
            self.state,
            next
        );
        debug!("Search state: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Run the search to completion. Always yields a well-formed envelope.
    pub async fn run(mut self) -> SearchOutcome {
        let start = Instant::now();
        let vertical = self.request.vertical;
        info!(
            "Search: tenant={}, vertical={}, query='{}', page={}",
            self.tenant.id, vertical, self.request.query, self.request.page
        );

        let built = QueryBuilder::new(&self.tenant, &self.services.settings).build(
            &self.request.query,
            &self.request.advanced,
            &self.request.locale,
        );
        self.transition(SearchState::QueryBuilt);

        if let Err(error) = self.validate(&built) {
            info!("Rejected query for tenant {}: {}", self.tenant.id, error);
            self.transition(SearchState::Errored);
            return SearchOutcome {
                envelope: SearchResultEnvelope::errored(vertical, error),
                states: self.history,
                impression: None,
            };
        }

        let query = self.provider_query(&built);
        let fetched = self.fetch(&query).await;
        let internal_results = fetched.source == Some(ProviderKind::InternalIndex);

        let normalized = ResponseNormalizer::new(&self.tenant, &self.services.excluded_domains)
            .normalize(&fetched.response);
        self.transition(SearchState::Normalized);

        let augmentation = if vertical == Vertical::News {
            Augmentation {
                related_searches: crate::results::remove_strong(&fetched.response.related_terms),
                ..Default::default()
            }
        } else {
            let ctx = AugmentContext {
                query: &built.query,
                tenant: &self.tenant,
                locale: &self.request.locale,
                first_page: self.request.is_first_page(),
                internal_results,
                provider_related: &fetched.response.related_terms,
            };
            ResultAugmenter::new(self.services.content.as_ref())
                .augment(ctx, &normalized)
                .await
        };
        self.transition(SearchState::Augmented);

        let response = fetched.response;
        let page = paginate(normalized, response.total, response.offset, self.request.per_page);
        self.transition(SearchState::Paginated);

        let envelope = SearchResultEnvelope {
            vertical,
            total: response.total,
            start_record: page.start_record,
            end_record: page.end_record,
            results: page.results,
            boosted_results: augmentation.boosted_contents,
            featured_collections: augmentation.featured_collections,
            indexed_documents: augmentation.indexed_documents,
            news_items: augmentation.news_items,
            agency: augmentation.agency,
            med_topic: augmentation.med_topic,
            related_searches: augmentation.related_searches,
            spelling_suggestion: clean_spelling_suggestion(
                response.spelling_suggestion.as_deref(),
                &self.request.query,
            ),
            error: None,
        };

        let impression = if self.request.skip_impressions {
            None
        } else {
            let modules = ModuleTag::for_envelope(&envelope, internal_results);
            Some(self.services.impressions.log(Impression::new(
                vertical,
                self.tenant.id.clone(),
                self.request.query.clone(),
                modules,
            )))
        };
        self.transition(SearchState::Logged);
        self.transition(SearchState::Done);

        info!(
            "Search completed in {:?}: tenant={}, vertical={}, total={}, shown={}",
            start.elapsed(),
            self.tenant.id,
            vertical,
            envelope.total,
            envelope.results.len()
        );

        SearchOutcome {
            envelope,
            states: self.history,
            impression,
        }
    }

    fn validate(&self, built: &FormattedQuery) -> Result<(), SearchError> {
        if self.request.query.chars().count() > self.services.settings.max_query_length {
            return Err(SearchError::invalid_query(QUERY_TOO_LONG));
        }
        if built.query.trim().is_empty() && self.request.vertical != Vertical::News {
            return Err(SearchError::invalid_query(QUERY_BLANK));
        }
        Ok(())
    }

    fn provider_query(&self, built: &FormattedQuery) -> ProviderQuery {
        let request = &self.request;
        let channel = request
            .channel
            .filter(|id| self.tenant.news_feed(*id).is_some());

        ProviderQuery {
            formatted_query: built.formatted.clone(),
            query: built.query.clone(),
            vertical: request.vertical,
            offset: request.offset(),
            page: request.page,
            per_page: request.per_page,
            filter_setting: request.filter_setting,
            enable_highlighting: request.enable_highlighting,
            locale: request.locale.clone(),
            tenant_id: self.tenant.id.clone(),
            channel,
            date_range: request.date_range,
            sort_by_relevance: request.sort_by_relevance,
            feeds: self.tenant.news_feeds.iter().map(|feed| feed.id).collect(),
        }
    }

    /// Provider stage: primary provider, then internal index fallback
    async fn fetch(&mut self, query: &ProviderQuery) -> Fetched {
        let vertical = query.vertical;
        let services = self.services;
        let providers = &services.providers;

        let Some(primary) = providers.select(&self.tenant, vertical) else {
            warn!(
                "No provider available for tenant {} ({} vertical)",
                self.tenant.id, vertical
            );
            self.transition(SearchState::ProviderCalled);
            return Fetched {
                response: ProviderResponse::empty(query.offset),
                source: None,
            };
        };

        let (result, cache_hit) = self.fetch_from(primary.as_ref(), query).await;
        self.transition(if cache_hit {
            SearchState::CacheHit
        } else {
            SearchState::ProviderCalled
        });

        // Failures fall back only for tenants with the internal index; zero
        // web hits fall back for everyone
        let fallback = match &result {
            Ok(response) if response.total == 0 => {
                providers.zero_hits_fallback(primary.kind(), vertical)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "Error getting search results from {} for tenant {}: {}",
                    primary.name(),
                    self.tenant.id,
                    e
                );
                providers.fallback(&self.tenant, primary.kind(), vertical)
            }
        };

        if let Some(fallback) = fallback {
            debug!(
                "Falling back to {} for tenant {}",
                fallback.name(),
                self.tenant.id
            );
            match self.fetch_from(fallback.as_ref(), query).await {
                (Ok(response), _) => {
                    return Fetched {
                        response,
                        source: Some(fallback.kind()),
                    }
                }
                (Err(e), _) => warn!(
                    "Error getting search results from {} for tenant {}: {}",
                    fallback.name(),
                    self.tenant.id,
                    e
                ),
            }
        }

        match result {
            Ok(response) => Fetched {
                response,
                source: Some(primary.kind()),
            },
            Err(_) => Fetched {
                response: ProviderResponse::empty(query.offset),
                source: None,
            },
        }
    }

    /// Cache lookup, then provider call. Returns whether the cache answered.
    async fn fetch_from(
        &self,
        client: &dyn ProviderClient,
        query: &ProviderQuery,
    ) -> (Result<ProviderResponse, ProviderError>, bool) {
        let cache = &self.services.cache;
        let key = client.cache_key(query);

        match cache.get(&key).await {
            Ok(Some(bytes)) => {
                let decoded = std::str::from_utf8(&bytes)
                    .map_err(|e| ProviderError::MalformedPayload(e.to_string()))
                    .and_then(|body| client.decode(query, body));
                match decoded {
                    Ok(response) => {
                        debug!("Cache hit: {}", key);
                        return (Ok(response), true);
                    }
                    Err(e) => warn!("Ignoring unreadable cache entry {}: {}", key, e),
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Cache read failed for {} ({:?}): {}",
                key,
                ErrorKind::CacheUnavailable,
                e
            ),
        }

        let body = match client.fetch(query).await {
            Ok(body) => body,
            Err(e) => return (Err(e), false),
        };
        let response = match client.decode(query, &body) {
            Ok(response) => response,
            Err(e) => return (Err(e), false),
        };

        if let Err(e) = cache
            .setex(&key, self.services.cache_ttl, body.into_bytes())
            .await
        {
            warn!("Cache write failed for {}: {}", key, e);
        }

        (Ok(response), false)
    }
}

/// Run independent searches concurrently, one orchestrator each
pub async fn search_verticals(
    services: &SearchServices,
    tenant: Arc<TenantScope>,
    requests: Vec<SearchRequest>,
) -> Vec<SearchOutcome> {
    let searches = requests.into_iter().map(|request| {
        SearchOrchestrator::new(services, Arc::clone(&tenant), request).run()
    });
    join_all(searches).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use SearchState::*;
        let path = [
            Idle,
            QueryBuilt,
            ProviderCalled,
            Normalized,
            Augmented,
            Paginated,
            Logged,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(QueryBuilt.can_transition_to(CacheHit));
        assert!(CacheHit.can_transition_to(Normalized));
    }

    #[test]
    fn test_errored_only_from_query_or_provider() {
        use SearchState::*;
        assert!(QueryBuilt.can_transition_to(Errored));
        assert!(ProviderCalled.can_transition_to(Errored));
        assert!(!CacheHit.can_transition_to(Errored));
        assert!(!Normalized.can_transition_to(Errored));
        assert!(!Idle.can_transition_to(Errored));
        assert!(!Done.can_transition_to(Idle));
        assert!(Errored.is_terminal());
    }
}
