//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_THRESHOLD: f32 = 0.75;
pub const DEFAULT_TOP_K: usize = 2;
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;
pub const DEFAULT_MAX_TOKENS: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherSettings {
    pub corpus_path: PathBuf,
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverSettings {
    pub kb_dir: PathBuf,
    pub store_dir: PathBuf,
    pub table: String,
    pub top_k: usize,
    pub min_chunk_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponderSettings {
    pub model_path: PathBuf,
    pub tokenizer_path: Option<PathBuf>,
    pub max_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub seed: u64,
    pub context_size: usize,
}

impl ResponderSettings {
    /// `tokenizer.json` next to the model file unless configured explicitly.
    pub fn tokenizer_path(&self) -> PathBuf {
        match &self.tokenizer_path {
            Some(p) => p.clone(),
            None => self
                .model_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("tokenizer.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model_dir: PathBuf,
    pub use_fake: bool,
    pub max_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub matcher: MatcherSettings,
    pub retriever: RetrieverSettings,
    pub responder: ResponderSettings,
    pub embedding: EmbeddingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            matcher: MatcherSettings {
                corpus_path: PathBuf::from("data/dataset.json"),
                threshold: DEFAULT_THRESHOLD,
            },
            retriever: RetrieverSettings {
                kb_dir: PathBuf::from("data/knowledge_base"),
                store_dir: PathBuf::from("data/vector_store"),
                table: "bfsi_knowledge".to_string(),
                top_k: DEFAULT_TOP_K,
                min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
            },
            responder: ResponderSettings {
                model_path: PathBuf::from("models/tiny_model.gguf"),
                tokenizer_path: None,
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: 0.7,
                top_p: 0.9,
                seed: 42,
                context_size: 2048,
            },
            embedding: EmbeddingSettings {
                model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
                use_fake: false,
                max_len: 256,
            },
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let t = self.matcher.threshold;
        if !(-1.0..=1.0).contains(&t) {
            return Err(Error::InvalidConfig(format!("matcher.threshold must be within [-1, 1], got {t}")));
        }
        if self.retriever.top_k == 0 {
            return Err(Error::InvalidConfig("retriever.top_k must be at least 1".into()));
        }
        if self.responder.max_tokens == 0 {
            return Err(Error::InvalidConfig("responder.max_tokens must be at least 1".into()));
        }
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be at least 1".into()));
        }
        Ok(())
    }

    /// Expand and anchor every configured path at `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let anchor = |p: &Path| resolve_with_base(base, p.to_string_lossy());
        self.matcher.corpus_path = anchor(&self.matcher.corpus_path);
        self.retriever.kb_dir = anchor(&self.retriever.kb_dir);
        self.retriever.store_dir = anchor(&self.retriever.store_dir);
        self.responder.model_path = anchor(&self.responder.model_path);
        self.responder.tokenizer_path = self.responder.tokenizer_path.as_deref().map(anchor);
        self.embedding.model_dir = anchor(&self.embedding.model_dir);
        self
    }
}

pub struct Config {
    figment: Figment,
    base: PathBuf,
}

impl Config {
    /// Load from the current directory, picking the env overlay from `RUST_ENV`.
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(&env::current_dir()?, &env_name)
    }

    pub fn load_from(base: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base: base.to_path_buf() })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings with paths resolved against the config directory.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings.resolve_paths(&self.base))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        s.validate().unwrap();
        assert_eq!(s.matcher.threshold, 0.75);
        assert_eq!(s.retriever.top_k, 2);
        assert_eq!(s.responder.max_tokens, 256);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut s = Settings::default();
        s.matcher.threshold = 1.5;
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn tokenizer_defaults_next_to_model() {
        let s = Settings::default();
        assert_eq!(s.responder.tokenizer_path(), PathBuf::from("models/tokenizer.json"));
    }

    #[test]
    fn relative_paths_anchor_at_base() {
        let s = Settings::default().resolve_paths(Path::new("/srv/bfsi"));
        assert_eq!(s.matcher.corpus_path, PathBuf::from("/srv/bfsi/data/dataset.json"));
        assert_eq!(s.retriever.store_dir, PathBuf::from("/srv/bfsi/data/vector_store"));
    }
}
