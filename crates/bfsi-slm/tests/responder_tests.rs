use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bfsi_core::config::Settings;
use bfsi_core::traits::TextGenerator;
use bfsi_slm::{Responder, ResponderState, MOCK_RESPONSE_PREFIX, STOP_MARKER};

/// Records the prompt it was given and answers with a fixed continuation.
type Calls = Arc<Mutex<Vec<(String, usize, String)>>>;

struct EchoGenerator { reply: String, seen: Calls }

impl TextGenerator for EchoGenerator {
    fn id(&self) -> &str { "echo" }
    fn complete(&self, prompt: &str, max_tokens: usize, stop: &str) -> anyhow::Result<String> {
        self.seen.lock().unwrap().push((prompt.to_string(), max_tokens, stop.to_string()));
        Ok(self.reply.clone())
    }
}

struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn id(&self) -> &str { "failing" }
    fn complete(&self, _prompt: &str, _max_tokens: usize, _stop: &str) -> anyhow::Result<String> {
        anyhow::bail!("out of memory")
    }
}

#[test]
fn missing_model_enters_mock_mode_and_never_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut settings = Settings::default().responder;
    settings.model_path = tmp.path().join("missing.gguf");

    let responder = Responder::load(&settings);

    assert!(responder.is_mock());
    assert!(matches!(responder.state(), ResponderState::Mock { reason } if reason.contains("missing.gguf")));
    for query in ["prepayment charges", "", "emoji 💳 and quotes '\""] {
        let out = responder.generate("You are a helpful BFSI assistant.", query, 256).expect("mock never fails");
        assert!(out.starts_with(MOCK_RESPONSE_PREFIX));
        assert!(out.contains(query));
    }
}

#[test]
fn loaded_generator_sees_rendered_prompt_and_output_is_trimmed() {
    let responder = Responder::with_generator(
        Box::new(EchoGenerator { reply: "  Prepayment costs 2%.\n".into(), seen: Calls::default() }),
        256,
    );
    assert!(!responder.is_mock());

    let out = responder.generate("System text", "prepayment charges", 64).unwrap();
    assert_eq!(out, "Prepayment costs 2%.");

    let ResponderState::Loaded(generator) = responder.state() else { panic!("expected loaded state") };
    assert_eq!(generator.id(), "echo");
}

#[test]
fn prompt_carries_system_query_and_stop_marker() {
    let seen = Calls::default();
    let responder = Responder::with_generator(Box::new(EchoGenerator { reply: "ok".into(), seen: seen.clone() }), 256);

    responder.generate("Context:\nRates are 8.5%", "home loan rate", 32).unwrap();

    let calls = seen.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (prompt, max_tokens, stop) = &calls[0];
    assert_eq!(prompt, "<|system|>\nContext:\nRates are 8.5%</s>\n<|user|>\nhome loan rate</s>\n<|assistant|>\n");
    assert_eq!(*max_tokens, 32);
    assert_eq!(stop, STOP_MARKER);
}

#[test]
fn generator_errors_propagate() {
    let responder = Responder::with_generator(Box::new(FailingGenerator), 256);
    assert!(responder.generate("sys", "q", 8).is_err());
}

#[test]
fn tokenizer_path_override_is_respected() {
    let mut settings = Settings::default().responder;
    settings.tokenizer_path = Some(PathBuf::from("/opt/tok.json"));
    assert_eq!(settings.tokenizer_path(), PathBuf::from("/opt/tok.json"));
    assert_eq!(STOP_MARKER, "</s>");
}
