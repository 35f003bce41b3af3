//! Settings structures for SearchGov-RS configuration

use crate::augment::StaticContentStore;
use crate::search::FilterSetting;
use crate::tenant::TenantScope;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main settings structure, loaded from settings.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub search: SearchSettings,
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub outgoing: OutgoingSettings,
    pub providers: ProvidersSettings,
    /// Tenant (affiliate) configurations
    pub tenants: Vec<TenantScope>,
    /// Domains excluded for every tenant
    pub excluded_domains: Vec<String>,
    /// Locally curated content (boosted results, featured collections, ...)
    pub content: StaticContentStore,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            search: SearchSettings::default(),
            server: ServerSettings::default(),
            cache: CacheSettings::default(),
            outgoing: OutgoingSettings::default(),
            providers: ProvidersSettings::default(),
            tenants: Vec::new(),
            excluded_domains: Vec::new(),
            content: StaticContentStore::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables (SEARCHGOV_* prefix)
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    /// Merge overrides from an arbitrary variable source
    pub fn merge_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("SEARCHGOV_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("SEARCHGOV_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = var("SEARCHGOV_BING_WEB_SUBSCRIPTION_ID") {
            self.providers.bing.api_key = Some(val);
        }
        if let Some(val) = var("SEARCHGOV_BING_IMAGE_SUBSCRIPTION") {
            self.providers.bing.image_api_key = Some(val);
        }
        if let Some(val) = var("SEARCHGOV_GOOGLE_API_KEY") {
            self.providers.google.api_key = Some(val);
        }
        if let Some(val) = var("SEARCHGOV_GOOGLE_CX") {
            self.providers.google.engine_id = Some(val);
        }
        if let Some(val) = var("SEARCHGOV_INTERNAL_INDEX_URL") {
            self.providers.internal_index.web_url = val;
        }
    }

    /// Get tenant config by id
    pub fn get_tenant(&self, id: &str) -> Option<&TenantScope> {
        self.tenants.iter().find(|t| t.id == id)
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Instance name reported by the health endpoint
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            instance_name: "SearchGov".to_string(),
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Locale for which no `language:` clause is added
    pub default_locale: String,
    /// Longest accepted query, in characters
    pub max_query_length: usize,
    /// Budget for the formatted query string sent to external providers
    pub query_string_allocation: usize,
    /// Results per page when the caller does not ask for a size
    pub default_per_page: u32,
    /// Results per page for news searches scoped to a single channel
    pub news_channel_per_page: u32,
    /// Largest page size a caller may request
    pub max_per_page: u32,
    /// Adult filter used when the caller's value is missing or invalid
    pub default_filter: FilterSetting,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            max_query_length: 1000,
            query_string_allocation: 1800,
            default_per_page: 10,
            news_channel_per_page: 20,
            max_per_page: 50,
            default_filter: FilterSetting::default(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8888,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Provider response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Disable to run every search against the providers
    pub enabled: bool,
    /// Time to live for cached provider payloads
    pub ttl_seconds: u64,
    /// Maximum number of cached payloads
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 60 * 60 * 6,
            max_capacity: 10_000,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Maximum request timeout
    pub max_request_timeout: f64,
    /// User agent sent to providers
    pub useragent: String,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: crate::DEFAULT_TIMEOUT,
            max_request_timeout: crate::MAX_TIMEOUT,
            useragent: format!("searchgov-rs/{}", crate::VERSION),
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Settings for every supported provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersSettings {
    pub bing: ProviderConfig,
    pub google: ProviderConfig,
    pub internal_index: ProviderConfig,
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            bing: ProviderConfig {
                web_url: "https://api.bing.microsoft.com/v7.0/search".to_string(),
                image_url: "https://api.cognitive.microsoft.com/bing/v7.0/images/search"
                    .to_string(),
                ..Default::default()
            },
            google: ProviderConfig {
                web_url: "https://www.googleapis.com/customsearch/v1".to_string(),
                image_url: "https://www.googleapis.com/customsearch/v1".to_string(),
                ..Default::default()
            },
            internal_index: ProviderConfig {
                web_url: "http://127.0.0.1:8081/api/v1/odie/search".to_string(),
                image_url: "http://127.0.0.1:8081/api/v1/oasis/images".to_string(),
                news_url: Some("http://127.0.0.1:8081/api/v1/odie/news".to_string()),
                ..Default::default()
            },
        }
    }
}

/// Individual provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Whether the provider is disabled
    pub disabled: bool,
    /// Web search endpoint
    pub web_url: String,
    /// Image search endpoint
    pub image_url: String,
    /// News search endpoint, if the provider serves news
    pub news_url: Option<String>,
    /// API key for web requests
    pub api_key: Option<String>,
    /// API key for image requests (falls back to `api_key`)
    pub image_api_key: Option<String>,
    /// Custom search engine id (Google `cx`)
    pub engine_id: Option<String>,
    /// Custom timeout for this provider
    pub timeout: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8888);
        assert_eq!(settings.cache.ttl_seconds, 21_600);
        assert_eq!(settings.search.max_query_length, 1000);
    }

    #[test]
    fn test_yaml_tenants() {
        let yaml = r#"
search:
  default_locale: en
providers:
  bing:
    api_key: secret
tenants:
  - id: usagov
    display_name: USA.gov
    allowed_domains: [usa.gov, gobierno.usa.gov]
    uses_internal_index: true
excluded_domains: [spam.gov]
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        let tenant = settings.get_tenant("usagov").unwrap();
        assert_eq!(tenant.allowed_domains.len(), 2);
        assert!(tenant.uses_internal_index);
        assert_eq!(settings.providers.bing.api_key.as_deref(), Some("secret"));
        // untouched sections keep their defaults
        assert!(settings.providers.google.web_url.contains("googleapis"));
        assert_eq!(settings.excluded_domains, vec!["spam.gov".to_string()]);
    }

    #[test]
    fn test_merge_vars() {
        let mut settings = Settings::default();
        settings.merge_vars(|key| match key {
            "SEARCHGOV_PORT" => Some("9090".to_string()),
            "SEARCHGOV_GOOGLE_CX" => Some("1234567890.abc".to_string()),
            _ => None,
        });

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.providers.google.engine_id.as_deref(), Some("1234567890.abc"));
    }
}
