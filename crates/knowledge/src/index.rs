//! In-memory vector index with exhaustive cosine search.
//!
//! Scores are cosine similarity, higher is better. The index is immutable
//! once built, so concurrent searches need no locking.

use crate::types::{Chunk, IndexEntry, SearchResult};
use ragchat_core::{AppError, AppResult};
use std::collections::BTreeSet;

/// Chunk vectors produced by one embedding model.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    provider: String,
    model: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            dimensions,
            entries: Vec::new(),
        }
    }

    /// Build an index from existing entries, checking every dimension.
    pub fn from_entries(
        provider: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        entries: Vec<IndexEntry>,
    ) -> AppResult<Self> {
        let mut index = Self::new(provider, model, dimensions);
        index.entries.reserve(entries.len());
        for entry in entries {
            index.push(entry.embedding, entry.chunk)?;
        }
        Ok(index)
    }

    /// Append one chunk. Rejects embeddings of the wrong width.
    pub fn push(&mut self, embedding: Vec<f32>, chunk: Chunk) -> AppResult<()> {
        if embedding.len() != self.dimensions {
            return Err(AppError::IndexBuild(format!(
                "Embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        self.entries.push(IndexEntry { embedding, chunk });
        Ok(())
    }

    /// Top `k` chunks by cosine similarity, best first.
    ///
    /// Returns fewer than `k` results when the index is smaller. Ties keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchResult>> {
        if k == 0 {
            return Err(AppError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }
        if query.len() != self.dimensions {
            return Err(AppError::Provider(format!(
                "Query embedding has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.embedding)))
            .collect();

        // Stable sort, so equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let results: Vec<SearchResult> = scored
            .into_iter()
            .map(|(i, score)| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect();

        tracing::debug!(
            "Retrieved {} chunks (requested top-{}), scores: {:?}",
            results.len(),
            k,
            results.iter().map(|r| r.score).collect::<Vec<_>>()
        );

        Ok(results)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct sources in the index.
    pub fn source_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.chunk.source())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Cosine similarity in [-1, 1]. Zero vectors and mismatched lengths score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
