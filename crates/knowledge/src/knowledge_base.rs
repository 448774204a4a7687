//! The searchable corpus: a persisted index loaded once, or built on demand.

use crate::config::KnowledgeConfig;
use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::ingest::IngestionPipeline;
use crate::progress::ProgressReporter;
use crate::store;
use crate::types::{IndexStats, IngestStats, SearchResult};
use ragchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How `load_or_build` obtained the index.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// An existing persisted index was loaded
    Loaded { chunks: usize },
    /// The corpus was ingested and the new index persisted
    Built(IngestStats),
}

/// Vector index for one corpus, bound to one embedding provider.
///
/// Searches fail with `IndexNotInitialized` until `load_or_build` or
/// `rebuild` has succeeded.
pub struct KnowledgeBase {
    workspace: PathBuf,
    config: KnowledgeConfig,
    provider: Arc<dyn EmbeddingProvider>,
    progress: ProgressReporter,
    index: Option<Arc<VectorIndex>>,
}

impl KnowledgeBase {
    pub fn new(
        workspace: impl Into<PathBuf>,
        config: KnowledgeConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            config,
            provider,
            progress: ProgressReporter::noop(),
            index: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Load the persisted index, or ingest the corpus when there is none.
    ///
    /// An incompatible or corrupt index is an error, never a silent rebuild.
    pub async fn load_or_build(&mut self) -> AppResult<LoadOutcome> {
        let index_dir = self.index_dir();

        let loaded = store::load(
            &index_dir,
            self.provider.provider_name(),
            self.provider.model_name(),
            self.provider.dimensions(),
        )?;

        match loaded {
            Some(index) => {
                let chunks = index.len();
                tracing::info!("Loaded existing index with {} chunks", chunks);
                self.index = Some(Arc::new(index));
                Ok(LoadOutcome::Loaded { chunks })
            }
            None => {
                tracing::info!("No existing index at {:?}, building from corpus", index_dir);
                self.rebuild().await.map(LoadOutcome::Built)
            }
        }
    }

    /// Ingest the corpus and replace the persisted index.
    ///
    /// On failure the previous in-memory and on-disk index stay as they were.
    pub async fn rebuild(&mut self) -> AppResult<IngestStats> {
        let pipeline = IngestionPipeline::new(&self.config, Arc::clone(&self.provider))
            .with_progress(self.progress.clone());

        let (index, stats) = pipeline
            .run(&self.data_dir(), &self.index_dir())
            .await?;

        self.index = Some(Arc::new(index));
        Ok(stats)
    }

    /// Top `k` chunks for an embedded query, best first.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<SearchResult>> {
        self.index
            .as_ref()
            .ok_or(AppError::IndexNotInitialized)?
            .search(query_embedding, k)
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.index.as_ref()
    }

    /// Statistics from the persisted manifest, if an index exists on disk.
    pub fn stats(&self) -> AppResult<Option<IndexStats>> {
        store::read_stats(&self.index_dir())
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config.data_path(&self.workspace)
    }

    pub fn index_dir(&self) -> PathBuf {
        self.config.index_path(&self.workspace)
    }
}
