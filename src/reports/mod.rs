//! Report aggregation
//!
//! Combines query and click counts from the analytics store into per-term
//! report rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub use crate::pagination::total_pages;

/// Most terms fetched per count
pub const MAX_RESULTS: usize = 50_000;

/// Analytics event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Search,
    Click,
}

/// Inclusive date range of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("analytics store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid report range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Source of aggregated analytics counts
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Most frequent query terms for `event` with their counts, most
    /// frequent first. `humans_only` excludes traffic flagged as bots.
    async fn top_terms(
        &self,
        site: &str,
        event: EventType,
        range: &ReportRange,
        humans_only: bool,
        size: usize,
    ) -> Result<Vec<(String, u64)>, ReportError>;
}

/// One row of the top queries report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRow {
    pub term: String,
    pub human_queries: u64,
    pub human_clicks: u64,
    pub human_ctr: String,
    pub raw_queries: u64,
    pub raw_clicks: u64,
    pub raw_ctr: String,
}

/// Click-through rate as a percentage with one decimal, or `--` when
/// either count is zero
pub fn ctr(clicks: u64, queries: u64) -> String {
    if clicks == 0 || queries == 0 {
        return "--".to_string();
    }
    format!("{:.1}%", clicks as f64 * 100.0 / queries as f64)
}

/// Top queries for a site, most human queries first.
///
/// The four counts are fetched concurrently; terms come from the raw
/// (bots and humans) query counts.
pub async fn top_queries(
    store: &dyn AnalyticsStore,
    site: &str,
    range: &ReportRange,
) -> Result<Vec<QueryRow>, ReportError> {
    let (raw_queries, human_queries, raw_clicks, human_clicks) = tokio::try_join!(
        store.top_terms(site, EventType::Search, range, false, MAX_RESULTS),
        store.top_terms(site, EventType::Search, range, true, MAX_RESULTS),
        store.top_terms(site, EventType::Click, range, false, MAX_RESULTS),
        store.top_terms(site, EventType::Click, range, true, MAX_RESULTS),
    )?;

    let human_queries: HashMap<_, _> = human_queries.into_iter().collect();
    let raw_clicks: HashMap<_, _> = raw_clicks.into_iter().collect();
    let human_clicks: HashMap<_, _> = human_clicks.into_iter().collect();

    let mut rows: Vec<QueryRow> = raw_queries
        .into_iter()
        .map(|(term, raw_query_count)| {
            let human_query_count = human_queries.get(&term).copied().unwrap_or(0);
            let raw_click_count = raw_clicks.get(&term).copied().unwrap_or(0);
            let human_click_count = human_clicks.get(&term).copied().unwrap_or(0);

            QueryRow {
                human_ctr: ctr(human_click_count, human_query_count),
                raw_ctr: ctr(raw_click_count, raw_query_count),
                term,
                human_queries: human_query_count,
                human_clicks: human_click_count,
                raw_queries: raw_query_count,
                raw_clicks: raw_click_count,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.human_queries.cmp(&a.human_queries));
    debug!("Top queries report for {}: {} rows", site, rows.len());
    Ok(rows)
}
