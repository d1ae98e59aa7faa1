use std::sync::Arc;
use tracing::{error, info, warn};

use bfsi_core::config::Settings;
use bfsi_core::data_processor::DataProcessor;
use bfsi_core::traits::Embedder;
use bfsi_embed::get_default_embedder;
use bfsi_match::SimilarityIndex;
use bfsi_slm::Responder;
use bfsi_vector::{DocumentRetriever, IngestReport};

use crate::orchestrator::Components;

/// Construct every component once, in order. A failure in one never stops
/// the others; it only leaves that component out.
pub async fn bootstrap(settings: &Settings) -> Components {
    let embedder: Option<Arc<dyn Embedder>> = match get_default_embedder(&settings.embedding) {
        Ok(embedder) => Some(embedder),
        Err(e) => {
            error!(error = %e, "embedding model unavailable; matcher and retriever disabled");
            None
        }
    };

    let matcher = embedder
        .clone()
        .map(|e| SimilarityIndex::load(&settings.matcher.corpus_path, e, settings.matcher.threshold));

    let retriever = match embedder {
        Some(e) => {
            let retriever = DocumentRetriever::open(&settings.retriever, e).await;
            let processor = DataProcessor::with_min_chunk_chars(settings.retriever.min_chunk_chars);
            match retriever.ingest(&settings.retriever.kb_dir, &processor).await {
                Ok(IngestReport::Ingested { chunks }) => info!(chunks, "knowledge base ingested"),
                Ok(IngestReport::AlreadyPopulated { existing }) => info!(existing, "knowledge base already populated"),
                Ok(IngestReport::Unavailable) => warn!("knowledge base not ingested; store unavailable"),
                Err(e) => warn!(error = %e, "knowledge base ingestion failed"),
            }
            Some(retriever)
        }
        None => None,
    };

    let responder = Some(Responder::load(&settings.responder));

    Components { matcher, retriever, responder }
}
