use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::DEFAULT_MIN_CHUNK_CHARS;
use crate::types::DocumentChunk;

/// Splits knowledge-base documents into paragraph chunks.
pub struct DataProcessor {
    min_chunk_chars: usize,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self { min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS }
    }
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_min_chunk_chars(min_chunk_chars: usize) -> Self { Self { min_chunk_chars } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        let files = self.list_txt_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            let content = self.read_file_content(file_path)?;
            let source = file_name(file_path);
            all_chunks.extend(self.chunk_content(&content, &source));
        }
        info!(files = files.len(), chunks = all_chunks.len(), "knowledge base chunked");
        Ok(all_chunks)
    }

    /// Paragraphs are separated by a blank line. The fragment index counts every
    /// fragment, so ids stay stable when short fragments are dropped.
    pub fn chunk_content(&self, content: &str, source: &str) -> Vec<DocumentChunk> {
        content
            .split("\n\n")
            .enumerate()
            .filter_map(|(i, fragment)| {
                let text = fragment.trim();
                (text.chars().count() > self.min_chunk_chars).then(|| DocumentChunk {
                    id: format!("{source}_{i}"),
                    text: text.to_string(),
                    source: source.to_string(),
                })
            })
            .collect()
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
            .collect();
        txt_files.sort();
        txt_files
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}
