//! Retrieval pipeline for ragchat.
//!
//! Loads a corpus directory, splits it into overlapping chunks, embeds them
//! into a persisted SQLite-backed vector index and answers questions over
//! it through a generation backend, as whole responses or streams.

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod knowledge_base;
pub mod parser;
pub mod progress;
pub mod rag;
pub mod store;
pub mod types;

pub use chunk::{Chunker, RecursiveSplitter};
pub use config::KnowledgeConfig;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider, QueryEmbeddingCache};
pub use index::{cosine_similarity, VectorIndex};
pub use ingest::IngestionPipeline;
pub use knowledge_base::{KnowledgeBase, LoadOutcome};
pub use parser::DocumentLoader;
pub use progress::{IngestPhase, ProgressEvent, ProgressReporter};
pub use rag::{
    ChatMessage, ChatReply, ChatRequest, ChatResponse, GenerationSettings, PromptAssembler,
    RagService, ResponseStream, StreamEvent,
};
pub use types::{Chunk, Document, IndexStats, IngestStats, SearchResult, SkippedSource};
