//! Search impression logging
//!
//! Every completed search records which result modules were shown. Logging is
//! fire-and-forget: it never delays or fails the search.

use crate::search::{SearchResultEnvelope, Vertical};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Result modules shown on a results page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleTag {
    /// Web results from an external provider
    #[serde(rename = "BWEB")]
    Web,
    /// Image results from an external provider
    #[serde(rename = "IMAG")]
    Image,
    /// Image results from the internal image index
    #[serde(rename = "OASIS")]
    InternalImage,
    #[serde(rename = "NEWS")]
    News,
    #[serde(rename = "OVER")]
    SpellingOverride,
    #[serde(rename = "BSPEL")]
    Spelling,
    #[serde(rename = "SREL")]
    Related,
    #[serde(rename = "AIDOC")]
    IndexedDocuments,
    #[serde(rename = "BOOS")]
    Boosted,
    #[serde(rename = "AGEN")]
    Agency,
    #[serde(rename = "MEDL")]
    MedTopic,
    #[serde(rename = "BBG")]
    FeaturedCollections,
}

impl ModuleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "BWEB",
            Self::Image => "IMAG",
            Self::InternalImage => "OASIS",
            Self::News => "NEWS",
            Self::SpellingOverride => "OVER",
            Self::Spelling => "BSPEL",
            Self::Related => "SREL",
            Self::IndexedDocuments => "AIDOC",
            Self::Boosted => "BOOS",
            Self::Agency => "AGEN",
            Self::MedTopic => "MEDL",
            Self::FeaturedCollections => "BBG",
        }
    }

    /// Modules shown for a completed search.
    ///
    /// `internal_results` marks organic results served by the internal index.
    pub fn for_envelope(envelope: &SearchResultEnvelope, internal_results: bool) -> Vec<Self> {
        let mut modules = Vec::new();
        let mut push = |tag: Self| {
            if !modules.contains(&tag) {
                modules.push(tag);
            }
        };

        if envelope.total > 0 {
            push(match envelope.vertical {
                Vertical::Web => Self::Web,
                Vertical::Image if internal_results => Self::InternalImage,
                Vertical::Image => Self::Image,
                Vertical::News => Self::News,
            });
        }
        if envelope.spelling_suggestion.is_some() {
            push(Self::SpellingOverride);
            push(Self::Spelling);
        }
        if envelope.has_related_searches() {
            push(Self::Related);
        }
        if envelope.news_items.as_ref().is_some_and(|n| !n.is_empty()) {
            push(Self::News);
        }
        if envelope.indexed_documents.as_ref().is_some_and(|d| !d.is_empty()) {
            push(Self::IndexedDocuments);
        }
        if envelope.has_boosted_contents() {
            push(Self::Boosted);
        }
        if envelope.agency.is_some() {
            push(Self::Agency);
        }
        if envelope.med_topic.is_some() {
            push(Self::MedTopic);
        }
        if envelope.has_featured_collections() {
            push(Self::FeaturedCollections);
        }

        modules
    }
}

impl fmt::Display for ModuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impression {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub vertical: Vertical,
    pub tenant: String,
    pub query: String,
    pub modules: Vec<ModuleTag>,
}

impl Impression {
    pub fn new(vertical: Vertical, tenant: impl Into<String>, query: impl Into<String>, modules: Vec<ModuleTag>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            vertical,
            tenant: tenant.into(),
            query: query.into(),
            modules,
        }
    }

    /// Module tags joined with `|`
    pub fn modules_label(&self) -> String {
        self.modules
            .iter()
            .map(ModuleTag::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImpressionError {
    #[error("impression sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for impressions
#[async_trait]
pub trait ImpressionSink: Send + Sync {
    async fn record(&self, impression: &Impression) -> Result<(), ImpressionError>;
}

/// Writes each impression as a structured event on the `impressions` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingImpressionLogger;

#[async_trait]
impl ImpressionSink for TracingImpressionLogger {
    async fn record(&self, impression: &Impression) -> Result<(), ImpressionError> {
        info!(
            target: "impressions",
            request_id = %impression.request_id,
            vertical = %impression.vertical,
            tenant = %impression.tenant,
            query = %impression.query,
            modules = %impression.modules_label(),
            "search impression"
        );
        Ok(())
    }
}

/// Keeps impressions in memory
#[derive(Debug, Default)]
pub struct MemoryImpressionSink {
    impressions: Mutex<Vec<Impression>>,
}

impl MemoryImpressionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn impressions(&self) -> Vec<Impression> {
        self.impressions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.impressions.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ImpressionSink for MemoryImpressionSink {
    async fn record(&self, impression: &Impression) -> Result<(), ImpressionError> {
        self.impressions
            .lock()
            .map_err(|e| ImpressionError::Unavailable(e.to_string()))?
            .push(impression.clone());
        Ok(())
    }
}

/// Hands impressions to a sink in the background
#[derive(Clone)]
pub struct ImpressionLogger {
    sink: Arc<dyn ImpressionSink>,
}

impl ImpressionLogger {
    pub fn new(sink: Arc<dyn ImpressionSink>) -> Self {
        Self { sink }
    }

    /// Record an impression without waiting for the sink. Sink failures are
    /// only logged.
    pub fn log(&self, impression: Impression) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.record(&impression).await {
                warn!(
                    "Failed to record impression {} for tenant {}: {}",
                    impression.request_id, impression.tenant, e
                );
            }
        })
    }
}

impl Default for ImpressionLogger {
    fn default() -> Self {
        Self::new(Arc::new(TracingImpressionLogger))
    }
}
