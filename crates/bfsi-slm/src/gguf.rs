use anyhow::{Result, anyhow, bail};
use std::fs::File;
use std::sync::Mutex;
use tracing::{debug, info};

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;

use bfsi_core::config::ResponderSettings;
use bfsi_core::traits::TextGenerator;

/// Quantized llama-family model loaded from a local GGUF file, run on CPU.
pub struct GgufGenerator {
    id: String,
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
    context_size: usize,
    temperature: f64,
    top_p: f64,
    seed: u64,
}

impl GgufGenerator {
    pub fn load(settings: &ResponderSettings) -> Result<Self> {
        let model_path = &settings.model_path;
        if !model_path.exists() {
            bail!("model not found at {}", model_path.display());
        }
        let device = Device::Cpu;
        let mut file = File::open(model_path)?;
        let content = gguf_file::Content::read(&mut file).map_err(|e| e.with_path(model_path))?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)?;
        let tokenizer_path = settings.tokenizer_path();
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let eos_token = tokenizer.token_to_id(crate::prompt::STOP_MARKER);
        let id = model_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        info!(model = %id, context_size = settings.context_size, "generation model loaded");
        Ok(Self {
            id,
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_token,
            context_size: settings.context_size,
            temperature: settings.temperature,
            top_p: settings.top_p,
            seed: settings.seed,
        })
    }

    fn next_logits(&self, model: &mut ModelWeights, tokens: &[u32], pos: usize) -> Result<Tensor> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        Ok(model.forward(&input, pos)?.squeeze(0)?)
    }
}

impl TextGenerator for GgufGenerator {
    fn id(&self) -> &str { &self.id }

    fn complete(&self, prompt: &str, max_tokens: usize, stop: &str) -> Result<String> {
        let prompt_tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?
            .get_ids()
            .to_vec();
        let budget = self.context_size.saturating_sub(prompt_tokens.len()).min(max_tokens);
        if budget == 0 {
            bail!("prompt of {} tokens leaves no room in a {}-token context", prompt_tokens.len(), self.context_size);
        }

        let mut model = self.model.lock().map_err(|_| anyhow!("generation model lock poisoned"))?;
        let mut processor = LogitsProcessor::new(self.seed, Some(self.temperature), Some(self.top_p));
        let mut next = processor.sample(&self.next_logits(&mut model, &prompt_tokens, 0)?)?;
        let mut generated: Vec<u32> = Vec::new();
        let mut text = String::new();
        for step in 0..budget {
            if Some(next) == self.eos_token { break; }
            generated.push(next);
            text = self.tokenizer.decode(&generated, true).map_err(|e| anyhow!("Decoding failed: {}", e))?;
            if let Some(at) = text.find(stop) {
                text.truncate(at);
                break;
            }
            if step + 1 == budget { break; }
            let logits = self.next_logits(&mut model, &[next], prompt_tokens.len() + step)?;
            next = processor.sample(&logits)?;
        }
        debug!(prompt_tokens = prompt_tokens.len(), generated = generated.len(), "generation complete");
        Ok(text)
    }
}
