//! Tier 3: context retrieval over the knowledge base.
use anyhow::{Result, anyhow};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use bfsi_core::config::RetrieverSettings;
use bfsi_core::data_processor::DataProcessor;
use bfsi_core::traits::{Embedder, VectorStore};
use bfsi_core::types::DocumentChunk;

use crate::search::LanceStore;

const EMBED_BATCH: usize = 64;

/// A retrieved chunk with its origin, for callers that attribute sources.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestReport {
    /// No store behind the retriever; nothing was read.
    Unavailable,
    /// The store already held chunks, so ingestion did not run.
    AlreadyPopulated { existing: usize },
    Ingested { chunks: usize },
}

/// Retrieval over an optional store. Without a store every lookup is empty
/// and `is_ready` reports false.
pub struct DocumentRetriever {
    embedder: Arc<dyn Embedder>,
    store: Option<Arc<dyn VectorStore>>,
    unavailable_reason: Option<String>,
}

impl DocumentRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store: Some(store), unavailable_reason: None }
    }

    pub fn unavailable(embedder: Arc<dyn Embedder>, reason: impl Into<String>) -> Self {
        Self { embedder, store: None, unavailable_reason: Some(reason.into()) }
    }

    /// Connect the LanceDB store; a connection failure degrades instead of erroring.
    pub async fn open(settings: &RetrieverSettings, embedder: Arc<dyn Embedder>) -> Self {
        match LanceStore::open(&settings.store_dir, &settings.table, embedder.dim()).await {
            Ok(store) => {
                info!(store = %settings.store_dir.display(), table = %settings.table, "vector store opened");
                Self::new(embedder, Arc::new(store))
            }
            Err(e) => {
                warn!(error = %e, store = %settings.store_dir.display(), "vector store unavailable; retrieval disabled");
                Self::unavailable(embedder, e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool { self.store.is_some() }

    pub fn unavailable_reason(&self) -> Option<&str> { self.unavailable_reason.as_deref() }

    pub async fn chunk_count(&self) -> Result<usize> {
        match &self.store {
            Some(store) => store.count().await,
            None => Ok(0),
        }
    }

    /// Chunk and store every `.txt` file in `dir`, unless the store already has data.
    ///
    /// Every chunk is embedded before anything is written, and the store gets a
    /// single `add`, so a failure leaves it empty and the next start retries.
    pub async fn ingest(&self, dir: &Path, processor: &DataProcessor) -> Result<IngestReport> {
        let Some(store) = &self.store else { return Ok(IngestReport::Unavailable); };
        let existing = store.count().await?;
        if existing > 0 {
            info!(existing, "knowledge base already populated");
            return Ok(IngestReport::AlreadyPopulated { existing });
        }
        let chunks = processor.process_directory(dir)?;
        if chunks.is_empty() {
            return Ok(IngestReport::Ingested { chunks: 0 });
        }
        info!(chunks = chunks.len(), "ingesting knowledge base");
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
                .map(|s| s.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let mut fingerprints = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            fingerprints.extend(self.embed_off_thread(texts).await?);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        store.add(&chunks, &fingerprints).await?;
        store.set_meta("chunk_count", &chunks.len().to_string()).await?;
        store.set_meta("ingested_at", &Utc::now().to_rfc3339()).await?;
        store.set_meta("embedder", &self.embedder.id()).await?;
        info!(chunks = chunks.len(), "ingestion complete");
        Ok(IngestReport::Ingested { chunks: chunks.len() })
    }

    /// A value recorded at ingestion (`chunk_count`, `ingested_at`, `embedder`).
    pub async fn meta(&self, key: &str) -> Result<Option<String>> {
        match &self.store {
            Some(store) => store.meta(key).await,
            None => Ok(None),
        }
    }

    async fn embed_off_thread(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| anyhow!("embedding task failed: {e}"))?
    }

    /// Up to `k` chunk texts, most similar first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<String> {
        self.retrieve_with_sources(query, k).await.into_iter().map(|c| c.text).collect()
    }

    /// Like `retrieve`, keeping ids, sources and scores. Failures yield no chunks.
    pub async fn retrieve_with_sources(&self, query: &str, k: usize) -> Vec<RetrievedChunk> {
        let Some(store) = &self.store else { return vec![]; };
        let fingerprint = match self.embed_off_thread(vec![query.to_string()]).await {
            Ok(mut fps) if !fps.is_empty() => fps.swap_remove(0),
            Ok(_) => {
                warn!("embedder returned no vector; no context");
                return vec![];
            }
            Err(e) => {
                warn!(error = %e, "query embedding failed; no context");
                return vec![];
            }
        };
        match store.nearest(&fingerprint, k).await {
            Ok(mut hits) => {
                hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
                hits.into_iter()
                    .take(k)
                    .map(|h| {
                        let DocumentChunk { id, text, source } = h.chunk;
                        RetrievedChunk { id, text, source, score: h.score }
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "vector search failed; no context");
                vec![]
            }
        }
    }
}
