use std::path::PathBuf;

use clap::Parser;

use bfsi_cli::{init_tracing, load_settings};
use bfsi_core::data_processor::DataProcessor;
use bfsi_embed::get_default_embedder;
use bfsi_vector::{DocumentRetriever, IngestReport};

#[derive(Parser)]
#[command(name = "bfsi-indexer", about = "Chunk and store the knowledge base (skipped if already populated)")]
struct Args {
    /// Knowledge-base directory; defaults to `retriever.kb_dir`.
    dir: Option<PathBuf>,

    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings(args.config_dir.as_deref())?;
    let kb_dir = args.dir.unwrap_or_else(|| settings.retriever.kb_dir.clone());

    let embedder = get_default_embedder(&settings.embedding)?;
    let retriever = DocumentRetriever::open(&settings.retriever, embedder).await;
    let processor = DataProcessor::with_min_chunk_chars(settings.retriever.min_chunk_chars);
    match retriever.ingest(&kb_dir, &processor).await? {
        IngestReport::Ingested { chunks } => println!("Ingested {} chunks from {}", chunks, kb_dir.display()),
        IngestReport::AlreadyPopulated { existing } => {
            let since = retriever.meta("ingested_at").await?.unwrap_or_else(|| "an unknown time".to_string());
            println!("Store already holds {} chunks (ingested {}); nothing to do", existing, since);
        }
        IngestReport::Unavailable => {
            let reason = retriever.unavailable_reason().unwrap_or("unknown");
            anyhow::bail!("vector store unavailable: {}", reason);
        }
    }
    Ok(())
}
