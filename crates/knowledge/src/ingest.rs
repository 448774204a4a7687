//! Corpus ingestion: load, chunk, embed, index, persist.

use crate::chunk::Chunker;
use crate::config::KnowledgeConfig;
use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::parser::DocumentLoader;
use crate::progress::ProgressReporter;
use crate::store;
use crate::types::{Chunk, Document, IngestStats, SkippedSource};
use ragchat_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Builds a vector index from a corpus directory.
pub struct IngestionPipeline {
    loader: DocumentLoader,
    chunker: Chunker,
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    progress: ProgressReporter,
}

impl IngestionPipeline {
    pub fn new(config: &KnowledgeConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            loader: DocumentLoader::new(&config.extensions),
            chunker: Chunker::new(&config.chunking),
            provider,
            batch_size: config.embedding.batch_size.max(1),
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Ingest `corpus_dir` and persist the result into `index_dir`.
    ///
    /// Nothing is written unless every step succeeds.
    pub async fn run(
        &self,
        corpus_dir: &Path,
        index_dir: &Path,
    ) -> AppResult<(VectorIndex, IngestStats)> {
        let (index, stats) = self.ingest(corpus_dir).await?;

        let path = store::index_file(index_dir);
        self.progress
            .persist(index.len() as u64, &path.display().to_string());
        store::persist(&index, index_dir)?;

        Ok((index, stats))
    }

    /// Ingest `corpus_dir` into a new in-memory index.
    ///
    /// Unreadable or empty files are skipped with a warning. Fails with
    /// `EmptyCorpus` when no file yields text and with `IndexBuild` when
    /// embedding fails.
    pub async fn ingest(&self, corpus_dir: &Path) -> AppResult<(VectorIndex, IngestStats)> {
        let start = Instant::now();
        tracing::info!("Starting ingestion of {:?}", corpus_dir);

        let loader = self.loader.clone();
        let progress = self.progress.clone();
        let dir = corpus_dir.to_path_buf();
        let (documents, skipped) =
            tokio::task::spawn_blocking(move || load_documents(&loader, &dir, &progress))
                .await
                .map_err(|e| AppError::Other(format!("Document loading task failed: {}", e)))??;

        let chunks = self.chunk_documents(&documents);
        let index = self.embed_chunks(chunks).await?;

        let stats = IngestStats {
            documents: documents.len(),
            skipped,
            chunks: index.len(),
            dimensions: index.dimensions(),
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Ingestion completed: {} documents, {} skipped, {} chunks in {:.2}s",
            stats.documents,
            stats.skipped.len(),
            stats.chunks,
            stats.duration_secs
        );

        Ok((index, stats))
    }

    fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let total = documents.len() as u64;
        let mut chunks = Vec::new();

        for (i, document) in documents.iter().enumerate() {
            let doc_chunks = self.chunker.chunk_document(document);
            self.progress
                .chunk(i as u64 + 1, Some(total), doc_chunks.len() as u32);
            chunks.extend(doc_chunks);
        }

        chunks
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> AppResult<VectorIndex> {
        let mut index = VectorIndex::new(
            self.provider.provider_name(),
            self.provider.model_name(),
            self.provider.dimensions(),
        );

        let total = chunks.len() as u64;
        let mut done = 0u64;
        let mut pending = chunks.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            let embeddings = self.provider.embed_batch(&texts).await.map_err(|e| {
                tracing::error!("Embedding failed after {} of {} chunks: {}", done, total, e);
                AppError::IndexBuild(format!("Embedding failed: {}", e))
            })?;

            if embeddings.len() != batch.len() {
                return Err(AppError::IndexBuild(format!(
                    "Provider returned {} embeddings for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            done += batch.len() as u64;
            self.progress
                .embed(done, Some(total), self.provider.model_name());

            for (embedding, chunk) in embeddings.into_iter().zip(batch) {
                index.push(embedding, chunk)?;
            }
            self.progress.index(index.len() as u64, Some(total));
        }

        Ok(index)
    }
}

/// Read every eligible file, collecting skips instead of failing.
fn load_documents(
    loader: &DocumentLoader,
    dir: &Path,
    progress: &ProgressReporter,
) -> AppResult<(Vec<Document>, Vec<SkippedSource>)> {
    let files = loader.discover(dir)?;
    let total = files.len() as u64;
    progress.discover(total, Some(total), &dir.display().to_string());

    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for (i, path) in files.into_iter().enumerate() {
        progress.parse(i as u64 + 1, Some(total), &display_name(&path));

        match loader.load(&path) {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => skipped.push(SkippedSource {
                path,
                reason: "no extractable text".to_string(),
            }),
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                skipped.push(SkippedSource {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    if documents.is_empty() {
        tracing::warn!("No documents with text found in {:?}", dir);
        return Err(AppError::EmptyCorpus {
            dir: dir.to_path_buf(),
        });
    }

    Ok((documents, skipped))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
