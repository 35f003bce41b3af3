//! Web server module
//!
//! Thin JSON API over the search orchestrator.

mod handlers;
mod routes;
mod state;

pub use handlers::{SearchParams, UNKNOWN_TENANT};
pub use routes::create_router;
pub use state::AppState;
