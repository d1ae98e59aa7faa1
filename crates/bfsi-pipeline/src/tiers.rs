//! The resolution tiers. Each tier either resolves the query or hands a
//! (possibly enriched) draft to the next one.
//!
//! Embedding and generation are CPU-bound, so the tiers run them on the
//! blocking pool and leave the async workers free for other queries.
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use bfsi_core::types::{Resolution, Source};
use bfsi_match::SimilarityIndex;
use bfsi_slm::Responder;
use bfsi_vector::DocumentRetriever;

pub const PERSONA: &str = "You are a helpful BFSI assistant. Use the following context to answer the user's question. If you don't know, say so.";
pub const GENERATION_CONFIDENCE: f32 = 0.5;
pub const GENERATION_ERROR_MESSAGE: &str = "I am currently experiencing high load. Please try again later.";
pub const SYSTEM_ERROR_MESSAGE: &str = "Please ensure backend components are initialized.";

/// State carried from one tier to the next within a single query.
#[derive(Debug, Default, Clone)]
pub struct Draft {
    /// Retrieved grounding chunks, best first.
    pub context: Vec<String>,
}

impl Draft {
    pub fn context_block(&self) -> String { self.context.join("\n") }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(Resolution),
    Continue,
}

#[async_trait]
pub trait Tier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, query: &str, draft: &mut Draft) -> Outcome;
}

/// Persona, plus the context block when there is one.
pub fn system_prompt(draft: &Draft) -> String {
    if draft.context.is_empty() {
        PERSONA.to_string()
    } else {
        format!("{PERSONA}\nContext:\n{}", draft.context_block())
    }
}

pub struct DatasetTier { index: Arc<SimilarityIndex> }

impl DatasetTier {
    pub fn new(index: Arc<SimilarityIndex>) -> Self { Self { index } }
}

#[async_trait]
impl Tier for DatasetTier {
    fn name(&self) -> &'static str { "dataset" }

    async fn handle(&self, query: &str, _draft: &mut Draft) -> Outcome {
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        let found = tokio::task::spawn_blocking(move || index.find_match(&query))
            .await
            .map_err(|e| anyhow::anyhow!("dataset lookup task failed: {e}"))
            .and_then(|r| r);
        match found {
            Ok(m) if m.matched => {
                info!(score = m.score, instruction = m.matched_instruction.as_deref().unwrap_or(""), "dataset match found");
                Outcome::Resolved(Resolution {
                    text: m.response.unwrap_or_default(),
                    source: Source::Dataset,
                    confidence: m.score.clamp(0.0, 1.0),
                })
            }
            Ok(m) => {
                info!(score = m.score, "no confident dataset match");
                Outcome::Continue
            }
            Err(e) => {
                warn!(error = %e, "dataset lookup failed");
                Outcome::Continue
            }
        }
    }
}

pub struct RetrievalTier { retriever: Arc<DocumentRetriever>, top_k: usize }

impl RetrievalTier {
    pub fn new(retriever: Arc<DocumentRetriever>, top_k: usize) -> Self { Self { retriever, top_k } }
}

#[async_trait]
impl Tier for RetrievalTier {
    fn name(&self) -> &'static str { "retrieval" }

    async fn handle(&self, query: &str, draft: &mut Draft) -> Outcome {
        if !self.retriever.is_ready() {
            return Outcome::Continue;
        }
        let chunks = self.retriever.retrieve(query, self.top_k).await;
        if !chunks.is_empty() {
            info!(chunks = chunks.len(), "retrieved grounding context");
        }
        draft.context.extend(chunks);
        Outcome::Continue
    }
}

pub struct GenerationTier { responder: Arc<Responder>, max_tokens: usize }

impl GenerationTier {
    pub fn new(responder: Arc<Responder>) -> Self {
        let max_tokens = responder.max_tokens();
        Self { responder, max_tokens }
    }
}

#[async_trait]
impl Tier for GenerationTier {
    fn name(&self) -> &'static str { "generation" }

    async fn handle(&self, query: &str, draft: &mut Draft) -> Outcome {
        let source = if draft.context.is_empty() { Source::Slm } else { Source::Rag };
        let responder = Arc::clone(&self.responder);
        let (system, query, max_tokens) = (system_prompt(draft), query.to_string(), self.max_tokens);
        let generated = tokio::task::spawn_blocking(move || responder.generate(&system, &query, max_tokens))
            .await
            .map_err(|e| anyhow::anyhow!("generation task failed: {e}"))
            .and_then(|r| r);
        match generated {
            Ok(text) => Outcome::Resolved(Resolution { text, source, confidence: GENERATION_CONFIDENCE }),
            Err(e) => {
                error!(error = %e, "generation failed");
                Outcome::Resolved(Resolution {
                    text: GENERATION_ERROR_MESSAGE.to_string(),
                    source: Source::Error,
                    confidence: 0.0,
                })
            }
        }
    }
}
