use std::fs;

use bfsi_core::config::Settings;
use bfsi_core::types::{QaEntry, Source};
use bfsi_pipeline::{bootstrap, Orchestrator};
use tempfile::TempDir;

fn settings_in(tmp: &TempDir) -> Settings {
    let mut settings = Settings::default().resolve_paths(tmp.path());
    settings.embedding.use_fake = true;
    settings
}

#[tokio::test]
async fn bootstrap_builds_every_component_from_disk() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_in(&tmp);
    fs::create_dir_all(settings.matcher.corpus_path.parent().unwrap()).unwrap();
    let corpus = vec![QaEntry {
        instruction: "What is the interest rate for a Home Loan?".into(),
        input: String::new(),
        output: "8.5% - 9.5%".into(),
    }];
    fs::write(&settings.matcher.corpus_path, serde_json::to_string(&corpus).unwrap()).unwrap();
    fs::create_dir_all(&settings.retriever.kb_dir).unwrap();
    fs::write(
        settings.retriever.kb_dir.join("charges.txt"),
        "Foreclosure of a personal loan after twelve EMIs attracts a 4% foreclosure charge.",
    )
    .unwrap();

    let components = bootstrap(&settings).await;
    assert!(components.responder.as_ref().is_some_and(|r| r.is_mock()), "no model file, so mock mode");
    let orchestrator = Orchestrator::new(components, settings.retriever.top_k);

    let health = orchestrator.health().components;
    assert!(health.matcher && health.retriever && health.responder);

    let hit = orchestrator.resolve("interest rate for home loan").await;
    assert_eq!(hit.source, Source::Dataset);
    assert_eq!(hit.text, "8.5% - 9.5%");

    let grounded = orchestrator.resolve("personal loan foreclosure charge").await;
    assert_eq!(grounded.source, Source::Rag);
    assert!(grounded.text.contains("personal loan foreclosure charge"));
}

#[tokio::test]
async fn bootstrap_without_data_still_answers() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(bootstrap(&settings_in(&tmp)).await, 2);

    let r = orchestrator.resolve("what is a fixed deposit").await;

    assert_eq!(r.source, Source::Slm);
    assert!(r.text.contains("what is a fixed deposit"));
}
