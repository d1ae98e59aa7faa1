use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use bfsi_cli::{init_tracing, load_settings, parse_query};
use bfsi_core::types::QueryResponse;
use bfsi_pipeline::{bootstrap, Orchestrator};

#[derive(Parser)]
#[command(name = "bfsi", about = "Tiered answers for banking and financial-services questions")]
struct Cli {
    /// Directory holding config.toml and the relative data paths it names.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one query and print `{response, source, confidence}`.
    Query {
        text: String,
        /// Treat TEXT as a `{"query": ...}` request body.
        #[arg(long)]
        json: bool,
    },
    /// Answer every non-empty line of FILE concurrently, one JSON line each.
    Batch { file: PathBuf },
    /// Print component readiness.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(cli.config_dir.as_deref())?;
    let top_k = settings.retriever.top_k;
    let orchestrator = Arc::new(Orchestrator::new(bootstrap(&settings).await, top_k));

    match cli.command {
        Command::Query { text, json } => {
            let query = parse_query(&text, json)?;
            let response = QueryResponse::from(orchestrator.resolve(&query).await);
            println!("{}", serde_json::to_string(&response)?);
        }
        Command::Batch { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let queries: Vec<String> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect();
            info!(queries = queries.len(), "resolving batch");
            let handles: Vec<_> = queries
                .into_iter()
                .map(|q| {
                    let orchestrator = orchestrator.clone();
                    tokio::spawn(async move { orchestrator.resolve(&q).await })
                })
                .collect();
            for joined in futures::future::join_all(handles).await {
                println!("{}", serde_json::to_string(&QueryResponse::from(joined?))?);
            }
        }
        Command::Health => {
            println!("{}", serde_json::to_string(&orchestrator.health())?);
        }
    }
    Ok(())
}
