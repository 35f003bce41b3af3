//! Search orchestration module
//!
//! Request and envelope models, news date ranges, and the per-request
//! orchestrator that drives a search through every stage.

mod models;
mod news;
mod orchestrator;

pub use models::*;
pub use news::{DateParams, DateRange};
pub use orchestrator::{
    search_verticals, SearchOrchestrator, SearchOutcome, SearchServices, SearchState,
    QUERY_BLANK, QUERY_TOO_LONG,
};
