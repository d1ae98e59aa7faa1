//! Tier 1: semantic lookup into the curated question bank.
use anyhow::{Result, ensure};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use bfsi_core::corpus::load_corpus;
use bfsi_core::traits::Embedder;
use bfsi_core::types::{MatchResult, QaEntry};

pub mod similarity;

pub use similarity::{best_match, cosine_similarity};

/// Curated entries and their fingerprints, indexed in parallel.
///
/// Read-only after construction, so one instance can serve concurrent queries.
pub struct SimilarityIndex {
    entries: Vec<QaEntry>,
    fingerprints: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl SimilarityIndex {
    pub fn empty(embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self { entries: Vec::new(), fingerprints: Vec::new(), embedder, threshold }
    }

    /// Fingerprint every instruction up front.
    pub fn from_entries(entries: Vec<QaEntry>, embedder: Arc<dyn Embedder>, threshold: f32) -> Result<Self> {
        if entries.is_empty() {
            return Ok(Self::empty(embedder, threshold));
        }
        let instructions: Vec<String> = entries.iter().map(|e| e.instruction.clone()).collect();
        info!(entries = entries.len(), "encoding dataset instructions");
        let fingerprints = embedder.embed_batch(&instructions)?;
        ensure!(
            fingerprints.len() == entries.len(),
            "embedder returned {} fingerprints for {} entries",
            fingerprints.len(),
            entries.len()
        );
        Ok(Self { entries, fingerprints, embedder, threshold })
    }

    /// Load the corpus file. Never fails: a missing or unusable corpus leaves
    /// the index empty, which only means no query can match.
    pub fn load(corpus_path: &Path, embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        let entries = match load_corpus(corpus_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "dataset unavailable; matcher starts empty");
                return Self::empty(embedder, threshold);
            }
        };
        match Self::from_entries(entries, embedder.clone(), threshold) {
            Ok(index) => {
                info!(entries = index.len(), "dataset encoded");
                index
            }
            Err(e) => {
                warn!(error = %e, "failed to encode dataset; matcher starts empty");
                Self::empty(embedder, threshold)
            }
        }
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn threshold(&self) -> f32 { self.threshold }

    pub fn entries(&self) -> &[QaEntry] { &self.entries }

    /// Best entry by cosine similarity; `matched` iff its score reaches the threshold.
    pub fn find_match(&self, query: &str) -> Result<MatchResult> {
        if self.is_empty() {
            return Ok(MatchResult::not_found());
        }
        let query_fp = self.embedder.embed(query)?;
        let Some((idx, score)) = best_match(&query_fp, &self.fingerprints) else {
            return Ok(MatchResult::not_found());
        };
        debug!(idx, score, threshold = self.threshold, "best dataset candidate");
        if score >= self.threshold {
            let entry = &self.entries[idx];
            Ok(MatchResult {
                matched: true,
                score,
                response: Some(entry.output.clone()),
                matched_instruction: Some(entry.instruction.clone()),
            })
        } else {
            Ok(MatchResult { matched: false, score, response: None, matched_instruction: None })
        }
    }
}
