//! HTTP request handlers

use super::state::AppState;
use crate::config::SearchSettings;
use crate::query::AdvancedQuery;
use crate::search::{
    DateParams, DateRange, FilterSetting, SearchOrchestrator, SearchRequest, Vertical,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Message for requests naming no known tenant
pub const UNKNOWN_TENANT: &str = "Site not found";

/// Query parameters shared by the search endpoints.
///
/// Numeric values are taken as strings so a malformed value falls back to
/// its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Tenant handle
    pub affiliate: Option<String>,
    pub query: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    /// Adult filter: off, low, medium (moderate) or high (strict)
    pub filter: Option<String>,
    pub locale: Option<String>,
    /// News feed id
    pub channel: Option<String>,
    /// `r` sorts news by relevance
    pub sort_by: Option<String>,
    pub enable_highlighting: Option<String>,
    #[serde(flatten)]
    pub dates: DateParams,
    #[serde(flatten)]
    pub advanced: AdvancedQuery,
}

impl SearchParams {
    /// Resolve the parameters into a search request for `vertical`
    pub fn into_request(
        self,
        vertical: Vertical,
        settings: &SearchSettings,
        now: DateTime<Utc>,
    ) -> SearchRequest {
        let channel = self.channel.as_deref().and_then(|c| c.trim().parse::<u64>().ok());
        let locale = self
            .locale
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| settings.default_locale.clone());

        let default_per_page = if vertical == Vertical::News && channel.is_some() {
            settings.news_channel_per_page
        } else {
            settings.default_per_page
        };
        let per_page = parse_positive(self.per_page.as_deref())
            .map(|n| n.min(settings.max_per_page))
            .unwrap_or(default_per_page);
        let page = parse_positive(self.page.as_deref()).unwrap_or(1);

        let mut request = SearchRequest::new(
            self.query.unwrap_or_default(),
            self.affiliate.unwrap_or_default(),
            vertical,
        )
        .with_page(page)
        .with_per_page(per_page)
        .with_filter(FilterSetting::parse_or(
            self.filter.as_deref(),
            settings.default_filter,
        ))
        .with_highlighting(!matches!(
            self.enable_highlighting.as_deref(),
            Some("false") | Some("0")
        ))
        .with_advanced(self.advanced);

        if vertical == Vertical::News {
            if let Some(channel) = channel {
                request = request.with_channel(channel);
            }
            if let Some(range) = DateRange::from_params(&self.dates, &locale, now) {
                request = request.with_date_range(range);
            }
            request.sort_by_relevance = self.sort_by.as_deref() == Some("r");
        }

        request.with_locale(locale)
    }
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn run_search(state: AppState, vertical: Vertical, params: SearchParams) -> Response {
    let affiliate = params.affiliate.clone().unwrap_or_default();
    let Some(tenant) = state.tenants.find(affiliate.trim()).await else {
        tracing::debug!("Unknown tenant '{}'", affiliate);
        return error_response(StatusCode::NOT_FOUND, UNKNOWN_TENANT);
    };

    let request = params.into_request(vertical, &state.services.settings, Utc::now());
    let outcome = SearchOrchestrator::new(&state.services, tenant, request)
        .run()
        .await;

    let status = if outcome.envelope.error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(outcome.envelope)).into_response()
}

/// Web search handler
pub async fn web(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    run_search(state, Vertical::Web, params).await
}

/// Image search handler
pub async fn images(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    run_search(state, Vertical::Image, params).await
}

/// News search handler
pub async fn news(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    run_search(state, Vertical::News, params).await
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "instance": state.instance_name(),
        "version": crate::VERSION,
        "providers": state.services.providers.names(),
    }))
}
