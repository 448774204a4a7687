//! Document chunking.

use super::recursive::RecursiveSplitter;
use crate::config::ChunkingConfig;
use crate::types::{Chunk, Document};

/// Turns documents into chunks that inherit the document metadata.
#[derive(Debug, Clone)]
pub struct Chunker {
    splitter: RecursiveSplitter,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            splitter: RecursiveSplitter::new(
                config.chunk_size,
                config.chunk_overlap,
                config.separators.clone(),
            ),
        }
    }

    /// Split one document. Sequence indices start at zero per document.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .splitter
            .split(&document.raw_text)
            .into_iter()
            .enumerate()
            .map(|(sequence_index, text)| Chunk {
                text,
                metadata: document.metadata.clone(),
                sequence_index,
            })
            .collect();

        tracing::debug!(
            "Chunked {}: {} chunks from {} bytes",
            document.source_id,
            chunks.len(),
            document.raw_text.len()
        );

        chunks
    }
}
