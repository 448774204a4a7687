//! Stats command handler.

use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::{store, KnowledgeConfig};

/// Show statistics of the persisted index
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let knowledge = KnowledgeConfig::load(&config.workspace)?;
        let index_dir = knowledge.index_path(&config.workspace);

        let Some(stats) = store::read_stats(&index_dir)? else {
            if self.json {
                println!("null");
            } else {
                println!("No index found at {}", index_dir.display());
                println!("Run `ragchat ingest` to build one");
            }
            return Ok(());
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Index: {}", stats.path.display());
            println!("  Embedding: {} / {} ({} dims)", stats.provider, stats.model, stats.dimensions);
            println!("  Sources: {}", stats.source_count);
            println!("  Chunks: {}", stats.chunk_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(built_at) = stats.built_at {
                println!("  Built: {}", built_at);
            }
        }

        Ok(())
    }
}
