//! Domain types shared by the resolution tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// A curated question/answer pair from the dataset corpus.
///
/// `input` is always empty for this corpus but kept so the file format
/// stays compatible with instruction-tuning datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    pub instruction: String,
    #[serde(default)]
    pub input: String,
    pub output: String,
}

/// A paragraph of a knowledge-base document, independently stored and searched.
///
/// - `id`: `<filename>_<fragment index>`, unique within the store
/// - `text`: trimmed, non-empty paragraph text
/// - `source`: originating file name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
}

/// A stored chunk returned by a nearest-neighbour lookup. Higher `score` is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Outcome of a Tier 1 lookup against the curated corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    pub score: f32,
    pub response: Option<String>,
    pub matched_instruction: Option<String>,
}

impl MatchResult {
    pub fn not_found() -> Self {
        Self { matched: false, score: 0.0, response: None, matched_instruction: None }
    }
}

/// Which tier (or failure mode) produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Dataset,
    Rag,
    Slm,
    Error,
    SystemError,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Dataset => "dataset",
            Source::Rag => "rag",
            Source::Slm => "slm",
            Source::Error => "error",
            Source::SystemError => "system_error",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single answer returned for one query, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub text: String,
    pub source: Source,
    pub confidence: f32,
}

/// Body of a `/query` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Body of a `/query` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub source: Source,
    pub confidence: f32,
}

impl From<Resolution> for QueryResponse {
    fn from(r: Resolution) -> Self {
        Self { response: r.text, source: r.source, confidence: r.confidence }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub matcher: bool,
    pub retriever: bool,
    pub responder: bool,
}

/// Body of a `/health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: ComponentHealth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_to_wire_names() {
        let names: Vec<String> = [Source::Dataset, Source::Rag, Source::Slm, Source::Error, Source::SystemError]
            .iter()
            .map(|s| serde_json::to_string(s).unwrap())
            .collect();
        assert_eq!(names, vec!["\"dataset\"", "\"rag\"", "\"slm\"", "\"error\"", "\"system_error\""]);
        assert_eq!(Source::SystemError.to_string(), "system_error");
    }

    #[test]
    fn qa_entry_input_defaults_to_empty() {
        let e: QaEntry = serde_json::from_str(r#"{"instruction":"q","output":"a"}"#).unwrap();
        assert_eq!(e.input, "");
    }

    #[test]
    fn query_response_wire_shape() {
        let r = Resolution { text: "hi".into(), source: Source::Rag, confidence: 0.5 };
        let v = serde_json::to_value(QueryResponse::from(r)).unwrap();
        assert_eq!(v["response"], "hi");
        assert_eq!(v["source"], "rag");
        assert_eq!(v["confidence"], 0.5);
    }
}
