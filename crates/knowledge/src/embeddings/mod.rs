//! Embedding providers and the query embedding cache.

pub mod cache;
pub mod config;
pub mod provider;
pub mod providers;

pub use cache::QueryEmbeddingCache;
pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
