//! SearchGov-RS: a multi-tenant search aggregation core
//!
//! Tenants ("affiliates") configure sites; end users query the web, image and
//! news verticals. Results come from an external ranking provider or the
//! internal index, are normalized, merged with tenant-curated content,
//! paginated and returned as a uniform envelope.

pub mod analytics;
pub mod augment;
pub mod cache;
pub mod config;
pub mod network;
pub mod pagination;
pub mod providers;
pub mod query;
pub mod reports;
pub mod results;
pub mod search;
pub mod tenant;
pub mod web;

pub use config::Settings;
pub use providers::{ProviderClient, ProviderSet};
pub use results::{NormalizedResult, ProviderResponse};
pub use search::{SearchOrchestrator, SearchRequest, SearchResultEnvelope, SearchServices};
pub use tenant::TenantScope;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for provider requests in seconds
pub const DEFAULT_TIMEOUT: f64 = 5.0;

/// Maximum timeout that can be set
pub const MAX_TIMEOUT: f64 = 30.0;
