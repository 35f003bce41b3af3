//! Provider loader for initializing providers from configuration

use super::bing::Bing;
use super::google::Google;
use super::http::HttpProvider;
use super::internal::InternalIndex;
use super::registry::ProviderSet;
use super::traits::{Provider, ProviderClient};
use crate::config::{ProviderConfig, Settings};
use crate::network::HttpClient;
use std::sync::Arc;
use tracing::info;

/// Loader for initializing providers from configuration
pub struct ProviderLoader;

impl ProviderLoader {
    /// Load all enabled providers from settings
    pub fn load(settings: &Settings, client: &HttpClient) -> ProviderSet {
        let providers = &settings.providers;
        let mut set = ProviderSet::new();

        let candidates: [(&ProviderConfig, Arc<dyn Provider>); 3] = [
            (&providers.bing, Arc::new(Bing::new(&providers.bing)) as Arc<dyn Provider>),
            (&providers.google, Arc::new(Google::new(&providers.google)) as Arc<dyn Provider>),
            (
                &providers.internal_index,
                Arc::new(InternalIndex::new(&providers.internal_index)) as Arc<dyn Provider>,
            ),
        ];

        for (config, provider) in candidates {
            if config.disabled {
                info!("Skipping disabled provider: {}", provider.name());
                continue;
            }

            let http = HttpProvider::new(provider, client.clone()).with_timeout(config.timeout);
            info!(
                "Loaded provider: {} (timeout {:?})",
                http.name(),
                http.timeout()
            );
            set.register(Arc::new(http));
        }

        info!("Loaded {} providers", set.len());
        set
    }
}
