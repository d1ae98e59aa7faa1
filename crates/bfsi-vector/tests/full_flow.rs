use std::fs;
use std::sync::Arc;

use bfsi_core::config::RetrieverSettings;
use bfsi_core::data_processor::DataProcessor;
use bfsi_core::traits::Embedder;
use bfsi_embed::{FakeEmbedder, FAKE_DIM};
use bfsi_vector::{DocumentRetriever, IngestReport};
use tempfile::TempDir;

const PREPAYMENT: &str = "Prepayment charges are 2% of the outstanding principal for fixed-rate loans.";
const LATE_FEE: &str = "A late payment fee of Rs 500 applies when an EMI is missed by more than seven days.";
const GOLD: &str = "Gold loans are sanctioned against ornaments with a loan-to-value ratio of up to 75%.";

fn settings(tmp: &TempDir) -> RetrieverSettings {
    RetrieverSettings {
        kb_dir: tmp.path().join("kb"),
        store_dir: tmp.path().join("store"),
        table: "bfsi_knowledge_test".to_string(),
        top_k: 2,
        min_chunk_chars: 50,
    }
}

fn write_kb(tmp: &TempDir) {
    let kb = tmp.path().join("kb");
    fs::create_dir_all(&kb).unwrap();
    fs::write(kb.join("charges.txt"), format!("{PREPAYMENT}\n\n{LATE_FEE}\n\nToo short.")).unwrap();
    fs::write(kb.join("gold.txt"), GOLD).unwrap();
}

#[tokio::test]
async fn lancedb_ingest_is_idempotent_and_searchable() {
    let tmp = TempDir::new().expect("tmp");
    write_kb(&tmp);
    let settings = settings(&tmp);
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(FAKE_DIM));

    let retriever = DocumentRetriever::open(&settings, embedder.clone()).await;
    assert!(retriever.is_ready());

    let first = retriever.ingest(&settings.kb_dir, &DataProcessor::new()).await.expect("ingest");
    assert_eq!(first, IngestReport::Ingested { chunks: 3 });
    assert_eq!(retriever.chunk_count().await.unwrap(), 3);

    let second = retriever.ingest(&settings.kb_dir, &DataProcessor::new()).await.expect("re-ingest");
    assert_eq!(second, IngestReport::AlreadyPopulated { existing: 3 });
    assert_eq!(retriever.chunk_count().await.unwrap(), 3);

    let hits = retriever.retrieve_with_sources("prepayment charges", 2).await;
    assert!(!hits.is_empty() && hits.len() <= 2);
    assert_eq!(hits[0].text, PREPAYMENT);
    assert_eq!(hits[0].source, "charges.txt");
    assert_eq!(hits[0].id, "charges.txt_0");
    if hits.len() == 2 { assert!(hits[0].score >= hits[1].score); }

    assert_eq!(retriever.meta("chunk_count").await.unwrap().as_deref(), Some("3"));
    assert_eq!(retriever.meta("embedder").await.unwrap(), Some(embedder.id()));
    assert!(retriever.meta("ingested_at").await.unwrap().is_some());
    assert_eq!(retriever.meta("no_such_key").await.unwrap(), None);
}

#[tokio::test]
async fn store_survives_reopen() {
    let tmp = TempDir::new().expect("tmp");
    write_kb(&tmp);
    let settings = settings(&tmp);
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(FAKE_DIM));

    {
        let retriever = DocumentRetriever::open(&settings, embedder.clone()).await;
        retriever.ingest(&settings.kb_dir, &DataProcessor::new()).await.expect("ingest");
    }
    // a changed knowledge base is not re-read once the store has data
    fs::write(settings.kb_dir.join("extra.txt"), "An extra paragraph that is comfortably longer than fifty characters.").unwrap();

    let reopened = DocumentRetriever::open(&settings, embedder).await;
    let report = reopened.ingest(&settings.kb_dir, &DataProcessor::new()).await.expect("ingest");
    assert_eq!(report, IngestReport::AlreadyPopulated { existing: 3 });
    assert_eq!(reopened.retrieve("gold loan value", 1).await, vec![GOLD.to_string()]);
}
