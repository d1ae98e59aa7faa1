//! Tier 2: free-text generation with a local small language model.
//!
//! A `Responder` is either backed by a loaded generator or in mock mode.
//! Mock mode never fails and always echoes the query inside a labelled
//! placeholder, so the pipeline stays usable without model weights.
use anyhow::Result;
use tracing::{info, warn};

use bfsi_core::config::{ResponderSettings, DEFAULT_MAX_TOKENS};
use bfsi_core::traits::TextGenerator;

pub mod gguf;
pub mod prompt;

pub use gguf::GgufGenerator;
pub use prompt::{render_prompt, STOP_MARKER};

pub const MOCK_RESPONSE_PREFIX: &str = "[SLM Mock Response]";

pub fn mock_response(user_query: &str) -> String {
    format!("{MOCK_RESPONSE_PREFIX} Based on fine-tuned knowledge: Here is a helpful response to '{user_query}'.")
}

pub enum ResponderState {
    Loaded(Box<dyn TextGenerator>),
    Mock { reason: String },
}

pub struct Responder {
    state: ResponderState,
    max_tokens: usize,
}

impl Responder {
    /// Load the GGUF model named in `settings`, falling back to mock mode.
    pub fn load(settings: &ResponderSettings) -> Self {
        match GgufGenerator::load(settings) {
            Ok(generator) => Self::with_generator(Box::new(generator), settings.max_tokens),
            Err(e) => {
                warn!(error = %e, model = %settings.model_path.display(), "generation model unavailable; using mock responses");
                Self { state: ResponderState::Mock { reason: e.to_string() }, max_tokens: settings.max_tokens }
            }
        }
    }

    pub fn with_generator(generator: Box<dyn TextGenerator>, max_tokens: usize) -> Self {
        info!(generator = generator.id(), "responder ready");
        Self { state: ResponderState::Loaded(generator), max_tokens }
    }

    pub fn mock(reason: impl Into<String>) -> Self {
        Self { state: ResponderState::Mock { reason: reason.into() }, max_tokens: DEFAULT_MAX_TOKENS }
    }

    pub fn state(&self) -> &ResponderState { &self.state }

    pub fn is_mock(&self) -> bool { matches!(self.state, ResponderState::Mock { .. }) }

    pub fn mode(&self) -> &'static str {
        match self.state {
            ResponderState::Loaded(_) => "loaded",
            ResponderState::Mock { .. } => "mock",
        }
    }

    pub fn max_tokens(&self) -> usize { self.max_tokens }

    /// Answer `user_query` under `system_prompt`; the result is trimmed.
    pub fn generate(&self, system_prompt: &str, user_query: &str, max_tokens: usize) -> Result<String> {
        match &self.state {
            ResponderState::Loaded(generator) => {
                let prompt = render_prompt(system_prompt, user_query);
                let text = generator.complete(&prompt, max_tokens, STOP_MARKER)?;
                Ok(text.trim().to_string())
            }
            ResponderState::Mock { .. } => Ok(mock_response(user_query)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_text_is_labelled_and_contains_query() {
        let r = Responder::mock("no weights");
        let out = r.generate("sys", "What is a loan?", 16).unwrap();
        assert!(out.starts_with(MOCK_RESPONSE_PREFIX));
        assert!(out.contains("What is a loan?"));
        assert!(r.is_mock());
        assert_eq!(r.mode(), "mock");
    }
}
