//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Metadata key holding the source path.
pub const META_SOURCE: &str = "source";
/// Metadata key holding the page count.
pub const META_PAGES: &str = "pages";
/// Metadata key holding the file name.
pub const META_FILENAME: &str = "filename";

/// One loaded source file. Discarded after chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source_id: String,
    pub raw_text: String,
    pub metadata: BTreeMap<String, String>,
}

/// A text segment produced from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub text: String,

    /// Inherited from the parent document
    pub metadata: BTreeMap<String, String>,

    /// Position within the parent document (0-indexed)
    pub sequence_index: usize,
}

impl Chunk {
    /// Source identifier, or an empty string when unknown.
    pub fn source(&self) -> &str {
        self.metadata
            .get(META_SOURCE)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// A chunk and its embedding, owned by the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,

    /// Cosine similarity, higher is better
    pub score: f32,
}

/// A source file that ingestion skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// Documents loaded with text
    pub documents: usize,

    /// Files skipped with a warning
    pub skipped: Vec<SkippedSource>,

    /// Chunks indexed
    pub chunks: usize,

    /// Embedding dimensionality
    pub dimensions: usize,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Summary of a persisted index, read from its manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub path: PathBuf,
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub source_count: usize,
    pub built_at: Option<DateTime<Utc>>,
    pub db_size_bytes: u64,
}
