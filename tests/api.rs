//! JSON API routes

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use searchgov_rs::analytics::{ImpressionLogger, MemoryImpressionSink};
use searchgov_rs::augment::StaticContentStore;
use searchgov_rs::cache::{CacheKey, NullCache};
use searchgov_rs::config::Settings;
use searchgov_rs::providers::{
    ProviderClient, ProviderError, ProviderKind, ProviderQuery, ProviderSet,
};
use searchgov_rs::results::{ProviderResponse, RawResult};
use searchgov_rs::search::{SearchServices, Vertical};
use searchgov_rs::tenant::{StaticTenantStore, TenantScope};
use searchgov_rs::web::{create_router, AppState, UNKNOWN_TENANT};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Echoes the query back as a single result
#[derive(Default)]
struct Echo {
    seen: Mutex<Vec<ProviderQuery>>,
}

#[async_trait]
impl ProviderClient for Echo {
    fn name(&self) -> &str {
        "internal_index"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::InternalIndex
    }

    fn supports(&self, _vertical: Vertical) -> bool {
        true
    }

    fn cache_key(&self, query: &ProviderQuery) -> CacheKey {
        CacheKey::internal(query.vertical, &query.query, &query.tenant_id, query.page, query.per_page)
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push(query.clone());
        Ok(query.query.clone())
    }

    fn decode(&self, query: &ProviderQuery, body: &str) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            total: 1,
            offset: query.offset,
            results: vec![RawResult::new(body, "https://www.usa.gov/result")],
            ..Default::default()
        })
    }
}

fn app(echo: Arc<Echo>) -> axum::Router {
    let services = SearchServices::new(
        ProviderSet::new().with(echo),
        Arc::new(NullCache),
        Arc::new(StaticContentStore::default()),
        ImpressionLogger::new(Arc::new(MemoryImpressionSink::new())),
    );
    let tenant = TenantScope::new("usagov")
        .with_provider(searchgov_rs::tenant::WebProvider::InternalIndex)
        .with_internal_index(true);
    let state = AppState::from_parts(
        Settings::default(),
        services,
        Arc::new(StaticTenantStore::new([tenant])),
    );
    create_router(state)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(Arc::default()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], searchgov_rs::VERSION);
}

#[tokio::test]
async fn test_web_search() {
    let echo = Arc::new(Echo::default());
    let (status, body) = get(
        app(echo.clone()),
        "/api/v2/search?affiliate=usagov&query=passport&page=2&per_page=5",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["startrecord"], 6);
    assert_eq!(body["results"][0]["title"], "passport");
    assert_eq!(body["results"][0]["unescapedUrl"], "https://www.usa.gov/result");

    let seen = echo.seen.lock().unwrap();
    assert_eq!(seen[0].vertical, Vertical::Web);
    assert_eq!(seen[0].offset, 5);
    assert_eq!(seen[0].per_page, 5);
}

#[tokio::test]
async fn test_image_and_news_routes() {
    let echo = Arc::new(Echo::default());
    let (status, _) = get(app(echo.clone()), "/api/v2/search/images?affiliate=usagov&query=eagle").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(
        app(echo.clone()),
        "/api/v2/search/news?affiliate=usagov&query=parks&tbs=w&sort_by=r",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let seen = echo.seen.lock().unwrap();
    assert_eq!(seen[0].vertical, Vertical::Image);
    assert_eq!(seen[1].vertical, Vertical::News);
    assert!(seen[1].sort_by_relevance);
    assert!(seen[1].date_range.and_then(|r| r.since).is_some());
}

#[tokio::test]
async fn test_unknown_tenant() {
    let (status, body) = get(app(Arc::default()), "/api/v2/search?affiliate=nope&query=taxes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], UNKNOWN_TENANT);
}

#[tokio::test]
async fn test_invalid_query() {
    let echo = Arc::new(Echo::default());
    let (status, body) = get(app(echo.clone()), "/api/v2/search?affiliate=usagov&query=").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
    assert!(echo.seen.lock().unwrap().is_empty());
}
