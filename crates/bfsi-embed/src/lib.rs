//! Sentence embeddings for the matcher and the retriever.
//!
//! `BertEmbedder` runs a local all-MiniLM-L6-v2 checkpoint on candle.
//! `FakeEmbedder` is a deterministic hashed bag-of-words used when
//! `APP_USE_FAKE_EMBEDDINGS=1` (or `embedding.use_fake`) is set.
use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use bfsi_core::config::EmbeddingSettings;
use bfsi_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub const FAKE_DIM: usize = 384;

pub struct BertEmbedder { id: String, model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl BertEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(model_dir = %model_dir.display(), "loading sentence embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let dim: usize = serde_json::from_str::<serde_json::Value>(&raw)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let id = format!(
            "bert:{}",
            model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        );
        info!(id = %id, dim, max_len, "sentence embedding model loaded");
        Ok(Self { id, model, tokenizer, device, dim, max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if start.elapsed().as_millis() > 100 { debug!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        let tensors = candle_core::safetensors::load(&safetensors, device)
            .with_context(|| format!("reading {}", safetensors.display()))?;
        return Ok(VarBuilder::from_tensors(tensors, DTYPE, device));
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .with_context(|| format!("reading {}", weights_path.display()))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DTYPE, device))
}

impl Embedder for BertEmbedder {
    fn id(&self) -> String { self.id.clone() }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "be", "for", "of", "to", "in", "on", "at", "by",
    "and", "or", "what", "which", "how", "do", "does", "i", "my", "me", "you", "your", "can",
    "it", "this", "that", "with",
];

/// Lexical stand-in for a real embedding model. Lowercased alphanumeric
/// tokens minus stopwords are hashed into buckets; texts with the same
/// content words get identical vectors.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    /// `dim` is clamped to at least one bucket.
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty() && !STOPWORDS.contains(t)) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> String { format!("fake-hash-{}", self.dim) }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_requested_by_env() {
        warn!("using FakeEmbedder; similarity scores are lexical");
        return Ok(Arc::new(FakeEmbedder::new(FAKE_DIM)));
    }
    let model_dir = resolve_model_dir(&settings.model_dir)?;
    Ok(Arc::new(BertEmbedder::load(&model_dir, settings.max_len)?))
}

fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { info!(dir = %p.display(), "using APP_MODEL_DIR"); return Ok(p); } }
    if configured.exists() { return Ok(configured.to_path_buf()); }
    Err(anyhow!("Could not locate embedding model directory {}", configured.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_ignores_case_punctuation_and_stopwords() {
        let e = FakeEmbedder::new(FAKE_DIM);
        let a = e.embed("What is the interest rate for a Home Loan?").unwrap();
        let b = e.embed("interest rate for home loan").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fake_all_stopwords_is_zero_vector() {
        let v = FakeEmbedder::new(16).embed("what is the").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn fake_zero_dim_is_clamped_to_one_bucket() {
        let e = FakeEmbedder::new(0);
        assert_eq!(e.dim(), 1);
        assert_eq!(e.embed("home loan").unwrap(), vec![1.0]);
        assert_eq!(e.id(), "fake-hash-1");
    }
}
