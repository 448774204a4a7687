//! Knowledge pipeline configuration.
//!
//! Loaded from `.ragchat/knowledge.yaml`; every field has a default so a
//! missing file or a partial file is valid.

use crate::embeddings::EmbeddingConfig;
use ragchat_core::config::STATE_DIR;
use ragchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the persisted index inside the index directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Configuration for ingestion, retrieval and chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeConfig {
    /// Corpus directory, relative to the workspace unless absolute
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Index directory, relative to the workspace unless absolute
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Eligible source file extensions (lowercase, without dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// Splitter settings. Sizes are counted in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Separators in priority order; `""` splits into characters
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Number of passages retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Number of conversation turns kept
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Generation model; falls back to the application model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Bound on cached query embeddings; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_cache_size: Option<usize>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

fn default_extensions() -> Vec<String> {
    ["pdf", "txt", "md"].iter().map(|s| s.to_string()).collect()
}

fn default_chunk_size() -> usize {
    4000
}

fn default_chunk_overlap() -> usize {
    200
}

pub fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ".", "!", "?", ",", " ", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_top_k() -> usize {
    1
}

fn default_max_history() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            index_dir: default_index_dir(),
            extensions: default_extensions(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            model: None,
            query_cache_size: None,
        }
    }
}

impl KnowledgeConfig {
    /// Load configuration for a workspace.
    ///
    /// Reads `.ragchat/knowledge.yaml` if it exists, otherwise returns the
    /// defaults. The result is validated either way.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let config_path = get_config_path(workspace);

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| {
                AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
            })?;

            let config: KnowledgeConfig = serde_yaml::from_str(&content).map_err(|e| {
                AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
            })?;

            tracing::debug!("Loaded knowledge config from {:?}", config_path);
            config
        } else {
            tracing::debug!("Using default knowledge config (no config file found)");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `.ragchat/knowledge.yaml`.
    pub fn save(&self, workspace: &Path) -> AppResult<()> {
        let config_path = get_config_path(workspace);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(&config_path, yaml).map_err(|e| {
            AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Saved knowledge config to {:?}", config_path);
        Ok(())
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> AppResult<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be at least 1".to_string()));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if chunking.separators.is_empty() {
            return Err(AppError::Config(
                "At least one separator is required".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        if self.chat.max_history == 0 {
            return Err(AppError::Config(
                "max_history must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be at least 1".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(AppError::Config(
                "At least one source extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute corpus directory.
    pub fn data_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.data_dir)
    }

    /// Absolute index directory.
    pub fn index_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.index_dir)
    }
}

/// Get the path to the knowledge config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeConfig::load(temp.path()).unwrap();

        assert_eq!(config.chunking.chunk_size, 4000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.chunking.separators.len(), 8);
        assert_eq!(config.chunking.separators.last().unwrap(), "");
        assert_eq!(config.retrieval.top_k, 1);
        assert_eq!(config.chat.max_history, 5);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.data_path(temp.path()), temp.path().join("data"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "chunking:\n  chunk_size: 100\n  chunk_overlap: 20\n").unwrap();

        let config = KnowledgeConfig::load(temp.path()).unwrap();
        assert_eq!(config.chunking.chunk_size, 100);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.chat.temperature, 0.7);
        assert_eq!(config.extensions, vec!["pdf", "txt", "md"]);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = KnowledgeConfig::default();
        config.retrieval.top_k = 3;
        config.chat.model = Some("llama3.1".to_string());

        config.save(temp.path()).unwrap();
        let loaded = KnowledgeConfig::load(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = KnowledgeConfig::default();
        config.chunking.chunk_size = 100;
        config.chunking.chunk_overlap = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = KnowledgeConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }
}
