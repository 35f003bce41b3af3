//! Application state shared across handlers

use crate::config::Settings;
use crate::network::HttpClient;
use crate::search::SearchServices;
use crate::tenant::{StaticTenantStore, TenantStore};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search collaborators
    pub services: Arc<SearchServices>,
    /// Tenant lookup
    pub tenants: Arc<dyn TenantStore>,
}

impl AppState {
    /// Create application state from the settings file
    pub fn new(settings: Settings, client: HttpClient) -> Self {
        let services = SearchServices::from_settings(&settings, &client);
        let tenants = StaticTenantStore::new(settings.tenants.clone());
        Self::from_parts(settings, services, Arc::new(tenants))
    }

    pub fn from_parts(
        settings: Settings,
        services: SearchServices,
        tenants: Arc<dyn TenantStore>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            services: Arc::new(services),
            tenants,
        }
    }

    /// Get instance name
    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }
}
