use std::sync::Arc;
use tracing::{debug, info};

use bfsi_core::config::DEFAULT_TOP_K;
use bfsi_core::types::{ComponentHealth, HealthReport, Resolution, Source};
use bfsi_match::SimilarityIndex;
use bfsi_slm::Responder;
use bfsi_vector::DocumentRetriever;

use crate::tiers::{DatasetTier, Draft, GenerationTier, Outcome, RetrievalTier, Tier, SYSTEM_ERROR_MESSAGE};

/// Whatever survived startup. An absent component simply has no tier.
#[derive(Default)]
pub struct Components {
    pub matcher: Option<SimilarityIndex>,
    pub retriever: Option<DocumentRetriever>,
    pub responder: Option<Responder>,
}

/// Runs each query through the tiers in order until one resolves it.
///
/// Holds no per-query state, so a shared instance serves concurrent queries.
pub struct Orchestrator {
    tiers: Vec<Box<dyn Tier>>,
    health: ComponentHealth,
}

impl Orchestrator {
    /// Dataset match, then context retrieval, then generation.
    pub fn new(components: Components, top_k: usize) -> Self {
        let health = ComponentHealth {
            matcher: components.matcher.is_some(),
            retriever: components.retriever.as_ref().is_some_and(|r| r.is_ready()),
            responder: components.responder.is_some(),
        };
        let mut tiers: Vec<Box<dyn Tier>> = Vec::new();
        if let Some(matcher) = components.matcher {
            tiers.push(Box::new(DatasetTier::new(Arc::new(matcher))));
        }
        if let Some(retriever) = components.retriever {
            tiers.push(Box::new(RetrievalTier::new(Arc::new(retriever), top_k)));
        }
        if let Some(responder) = components.responder {
            tiers.push(Box::new(GenerationTier::new(Arc::new(responder))));
        }
        info!(tiers = ?tiers.iter().map(|t| t.name()).collect::<Vec<_>>(), "orchestrator ready");
        Self { tiers, health }
    }

    pub fn with_default_top_k(components: Components) -> Self { Self::new(components, DEFAULT_TOP_K) }

    /// Build from explicit tiers, e.g. test doubles.
    pub fn from_tiers(tiers: Vec<Box<dyn Tier>>, health: ComponentHealth) -> Self { Self { tiers, health } }

    pub fn tier_names(&self) -> Vec<&'static str> { self.tiers.iter().map(|t| t.name()).collect() }

    pub async fn resolve(&self, query: &str) -> Resolution {
        info!(query, "received query");
        let mut draft = Draft::default();
        for tier in &self.tiers {
            if let Outcome::Resolved(resolution) = tier.handle(query, &mut draft).await {
                debug!(tier = tier.name(), source = %resolution.source, confidence = resolution.confidence, "query resolved");
                return resolution;
            }
        }
        Resolution { text: SYSTEM_ERROR_MESSAGE.to_string(), source: Source::SystemError, confidence: 0.0 }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport { status: "ok".to_string(), components: self.health }
    }
}
