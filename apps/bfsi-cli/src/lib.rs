//! Shared start-up for the command-line binaries.
use std::path::Path;

use anyhow::Context;
use bfsi_core::config::{Config, Settings};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays machine-readable JSON.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn load_settings(config_dir: Option<&Path>) -> anyhow::Result<Settings> {
    let config = match config_dir {
        Some(dir) => {
            let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            Config::load_from(dir, &env_name)?
        }
        None => Config::load()?,
    };
    config.settings().context("loading settings")
}

/// Accepts either raw text or a `{"query": ...}` request body.
pub fn parse_query(raw: &str, json: bool) -> anyhow::Result<String> {
    if json {
        let request: bfsi_core::types::QueryRequest = serde_json::from_str(raw).context("invalid query request body")?;
        Ok(request.query)
    } else {
        Ok(raw.to_string())
    }
}
