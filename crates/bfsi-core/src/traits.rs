use async_trait::async_trait;

use crate::types::{DocumentChunk, ScoredChunk};

/// Produces fingerprints (fixed-length vectors) for text.
pub trait Embedder: Send + Sync {
    /// Identifies the model behind the fingerprints, recorded at ingestion.
    fn id(&self) -> String { format!("embedder-{}d", self.dim()) }
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Raw text continuation. Implementations stop before `stop` if it appears.
pub trait TextGenerator: Send + Sync {
    fn id(&self) -> &str;
    fn complete(&self, prompt: &str, max_tokens: usize, stop: &str) -> anyhow::Result<String>;
}

/// Durable chunk + fingerprint storage with nearest-neighbour lookup.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn count(&self) -> anyhow::Result<usize>;
    async fn add(&self, chunks: &[DocumentChunk], fingerprints: &[Vec<f32>]) -> anyhow::Result<()>;
    async fn nearest(&self, fingerprint: &[f32], k: usize) -> anyhow::Result<Vec<ScoredChunk>>;

    /// Record a key/value annotation about the store's contents.
    async fn set_meta(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn meta(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
