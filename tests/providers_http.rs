//! Provider adapters exercised over HTTP against a mock server

use searchgov_rs::analytics::{ImpressionLogger, MemoryImpressionSink};
use searchgov_rs::augment::StaticContentStore;
use searchgov_rs::cache::NullCache;
use searchgov_rs::config::ProviderConfig;
use searchgov_rs::network::HttpClient;
use searchgov_rs::providers::bing::{Bing, SUBSCRIPTION_HEADER};
use searchgov_rs::providers::google::Google;
use searchgov_rs::providers::internal::InternalIndex;
use searchgov_rs::providers::{
    HttpProvider, ProviderClient, ProviderError, ProviderQuery, ProviderSet,
};
use searchgov_rs::search::{FilterSetting, SearchOrchestrator, SearchRequest, SearchServices, Vertical};
use searchgov_rs::tenant::{TenantScope, WebProvider};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        web_url: format!("{}/web", server.uri()),
        image_url: format!("{}/images", server.uri()),
        news_url: Some(format!("{}/news", server.uri())),
        api_key: Some("secret".to_string()),
        engine_id: Some("cx123".to_string()),
        ..Default::default()
    }
}

fn web_query() -> ProviderQuery {
    ProviderQuery {
        formatted_query: "(taxes) (site:irs.gov)".to_string(),
        query: "taxes".to_string(),
        vertical: Vertical::Web,
        offset: 0,
        page: 1,
        per_page: 10,
        filter_setting: FilterSetting::Medium,
        enable_highlighting: true,
        locale: "en".to_string(),
        tenant_id: "usagov".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_bing_web_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .and(query_param("q", "(taxes) (site:irs.gov)"))
        .and(query_param("mkt", "en-US"))
        .and(header(SUBSCRIPTION_HEADER, "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"webPages": {"totalEstimatedMatches": 42, "value": [
                {"name": "Taxes", "url": "https://www.irs.gov/", "snippet": "File"}
            ]}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpProvider::new(Arc::new(Bing::new(&config(&server))), HttpClient::new().unwrap());
    let response = client.execute(&web_query()).await.unwrap();

    assert_eq!(response.total, 42);
    assert_eq!(response.results[0].title.as_deref(), Some("Taxes"));
}

#[tokio::test]
async fn test_status_error_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = HttpProvider::new(Arc::new(Bing::new(&config(&server))), HttpClient::new().unwrap());
    let err = client.execute(&web_query()).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::Status {
            status: 503,
            body: "maintenance".to_string()
        }
    );
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HttpProvider::new(Arc::new(Bing::new(&config(&server))), HttpClient::new().unwrap())
        .with_timeout(Some(0.2));
    let err = client.execute(&web_query()).await.unwrap_err();

    assert_eq!(err, ProviderError::Timeout);
}

#[tokio::test]
async fn test_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = HttpProvider::new(Arc::new(Bing::new(&config(&server))), HttpClient::new().unwrap());
    let err = client.execute(&web_query()).await.unwrap_err();

    assert!(matches!(err, ProviderError::MalformedPayload(_)));
}

#[tokio::test]
async fn test_google_image_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .and(query_param("cx", "cx123"))
        .and(query_param("key", "secret"))
        .and(query_param("searchType", "image"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"searchInformation": {"totalResults": "1"}, "items": [
                {"title": "Bald eagle", "link": "https://fws.gov/eagle.jpg"}
            ]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpProvider::new(Arc::new(Google::new(&config(&server))), HttpClient::new().unwrap());
    let query = ProviderQuery {
        vertical: Vertical::Image,
        ..web_query()
    };
    let response = client.execute(&query).await.unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.results.len(), 1);
}

#[tokio::test]
async fn test_internal_index_news_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("affiliate", "usagov"))
        .and(query_param("channel", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"total": 1, "results": [
                {"title": "Park reopens", "url": "https://nps.gov/news/1",
                 "published_at": "2012-10-15T12:00:00Z"}
            ]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpProvider::new(
        Arc::new(InternalIndex::new(&config(&server))),
        HttpClient::new().unwrap(),
    );
    let query = ProviderQuery {
        vertical: Vertical::News,
        channel: Some(7),
        ..web_query()
    };
    let response = client.execute(&query).await.unwrap();

    assert_eq!(response.total, 1);
    assert!(response.results[0].published_at.is_some());
}

#[tokio::test]
async fn test_unsupported_vertical_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpProvider::new(Arc::new(Bing::new(&config(&server))), HttpClient::new().unwrap());
    let query = ProviderQuery {
        vertical: Vertical::News,
        ..web_query()
    };
    let err = client.execute(&query).await.unwrap_err();

    assert_eq!(err, ProviderError::UnsupportedVertical(Vertical::News));
}

#[tokio::test]
async fn test_bing_estimate_without_results_falls_back_to_internal_index() {
    let bing_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"webPages": {"totalEstimatedMatches": 500, "offset": 20, "value": []}}"#,
        ))
        .expect(1)
        .mount(&bing_server)
        .await;

    let index_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .and(query_param("affiliate", "usagov"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"total": 1, "results": [
                {"title": "Local page", "url": "https://www.usa.gov/local"}
            ]}"#,
        ))
        .expect(1)
        .mount(&index_server)
        .await;

    let http = HttpClient::new().unwrap();
    let providers = ProviderSet::new()
        .with(Arc::new(HttpProvider::new(
            Arc::new(Bing::new(&config(&bing_server))),
            http.clone(),
        )))
        .with(Arc::new(HttpProvider::new(
            Arc::new(InternalIndex::new(&config(&index_server))),
            http,
        )));
    let services = SearchServices::new(
        providers,
        Arc::new(NullCache),
        Arc::new(StaticContentStore::default()),
        ImpressionLogger::new(Arc::new(MemoryImpressionSink::new())),
    );
    // Tenant has not opted into the internal index
    let tenant = Arc::new(TenantScope::new("usagov").with_provider(WebProvider::Bing));

    let outcome = SearchOrchestrator::new(&services, tenant, SearchRequest::web("obscure", "usagov"))
        .run()
        .await;

    assert!(outcome.envelope.error.is_none());
    assert_eq!(outcome.envelope.total, 1);
    assert_eq!(outcome.envelope.results[0].title, "Local page");
}
