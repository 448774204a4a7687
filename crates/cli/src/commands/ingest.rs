//! Ingest command handler.

use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::{IngestStats, KnowledgeConfig, LoadOutcome, ProgressReporter};

use super::{knowledge_base, stderr_progress};

/// Build the vector index from the corpus directory
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Re-ingest even when a persisted index exists
    #[arg(long)]
    pub rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command (rebuild: {})", self.rebuild);

        let knowledge = KnowledgeConfig::load(&config.workspace)?;
        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            stderr_progress()
        };
        let mut kb = knowledge_base(config, knowledge, progress)?;

        let outcome = if self.rebuild {
            LoadOutcome::Built(kb.rebuild().await?)
        } else {
            kb.load_or_build().await?
        };

        match outcome {
            LoadOutcome::Built(stats) => self.print_built(&stats)?,
            LoadOutcome::Loaded { chunks } => {
                if self.json {
                    let output = serde_json::json!({
                        "rebuilt": false,
                        "chunks": chunks,
                        "indexDir": kb.index_dir(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                } else {
                    println!(
                        "Index already exists with {} chunks; use --rebuild to re-ingest",
                        chunks
                    );
                }
            }
        }

        Ok(())
    }

    fn print_built(&self, stats: &IngestStats) -> AppResult<()> {
        if self.json {
            let output = serde_json::json!({
                "rebuilt": true,
                "documents": stats.documents,
                "chunks": stats.chunks,
                "dimensions": stats.dimensions,
                "durationSecs": stats.duration_secs,
                "skipped": stats.skipped,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!(
            "Ingested {} documents ({} chunks, {} dims) in {:.2}s",
            stats.documents, stats.chunks, stats.dimensions, stats.duration_secs
        );
        if !stats.skipped.is_empty() {
            println!("Skipped {} files:", stats.skipped.len());
            for skipped in &stats.skipped {
                println!("- {} ({})", skipped.path.display(), skipped.reason);
            }
        }
        Ok(())
    }
}
