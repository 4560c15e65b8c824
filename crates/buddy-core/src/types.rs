//! Domain types shared by the builder, retriever and pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type DocumentId = String;

/// One row of the FAQ table.
///
/// - `row`: 0-based position among the data rows (header excluded)
/// - `prompt`: value of the designated prompt column; identifies the row
/// - `content`: every column rendered as `header: value`, one per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub row: usize,
    pub prompt: String,
    pub content: String,
}

impl SourceRecord {
    pub fn id(&self) -> DocumentId {
        format!("row:{}", self.row)
    }
}

/// A stored document returned by the retriever.
///
/// `score` is `1 - cosine distance`; higher is nearer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: DocumentId,
    pub prompt: String,
    pub content: String,
    pub score: f32,
}

/// Metadata written next to the index at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub embedder_id: String,
    pub dim: usize,
    pub row_count: usize,
    pub source: String,
    pub built_at: String,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub documents: usize,
    pub dim: usize,
    pub embedder_id: String,
    pub elapsed: Duration,
}
