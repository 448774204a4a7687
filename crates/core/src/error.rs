//! Error types for ragchat.
//!
//! One enum covers the whole retrieval-and-generation pipeline: corpus
//! ingestion, index persistence, provider calls, prompt rendering and the
//! ambient configuration/I-O failures around them.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for ragchat.
///
/// All functions in the workspace return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// The corpus directory holds no eligible source documents.
    #[error("No eligible source documents found in {dir:?}")]
    EmptyCorpus { dir: PathBuf },

    /// A single source document could not be read or parsed.
    #[error("Failed to read source {path:?}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    /// Search was attempted before the index was loaded or built.
    #[error("Vector index not initialized. Load or build the index first.")]
    IndexNotInitialized,

    /// The persisted index is corrupt or incompatible with the active provider.
    #[error("Failed to load index: {0}")]
    IndexLoad(String),

    /// Ingestion failed partway; nothing was persisted.
    #[error("Failed to build index: {0}")]
    IndexBuild(String),

    /// Embedding or generation backend failure.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Malformed chat request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error must keep the service from accepting queries.
    pub fn is_fatal_for_startup(&self) -> bool {
        matches!(
            self,
            AppError::EmptyCorpus { .. }
                | AppError::IndexLoad(_)
                | AppError::IndexBuild(_)
                | AppError::IndexNotInitialized
                | AppError::Config(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
