//! Chat command handler.
//!
//! Runs an interactive conversation on stdin, or a line-delimited JSON
//! protocol where each input line is a chat request.

use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::{ChatReply, ChatRequest, KnowledgeConfig, RagService, StreamEvent};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ask::stream_to_stdout;
use super::start_service;

/// Interactive conversation about the corpus
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Read chat requests as JSON lines and answer with JSON lines
    #[arg(long)]
    pub jsonl: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command (jsonl: {})", self.jsonl);

        let knowledge = KnowledgeConfig::load(&config.workspace)?;
        let service = start_service(config, knowledge).await?;

        if self.jsonl {
            run_jsonl(&service).await
        } else {
            run_interactive(&service).await
        }
    }
}

async fn run_interactive(service: &RagService) -> AppResult<()> {
    eprintln!("Ask about your documents. Commands: /clear, /clear-cache, /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else { break };
        let query = line.trim();

        match query {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                service.clear_history().await;
                eprintln!("Conversation cleared");
            }
            "/clear-cache" => {
                service.clear_query_cache().await;
                eprintln!("Query cache cleared");
            }
            _ => {
                if let Err(e) = stream_to_stdout(service, query).await {
                    eprintln!("Error: {}", e);
                }
            }
        }
    }

    Ok(())
}

async fn run_jsonl(service: &RagService) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: ChatRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Invalid chat request: {}", e);
                emit(&StreamEvent::error(format!("Invalid chat request: {}", e)))?;
                continue;
            }
        };

        match service.handle(request).await {
            Ok(ChatReply::Complete(response)) => emit(&response)?,
            Ok(ChatReply::Stream(mut stream)) => {
                while let Some(event) = stream.next_event().await {
                    emit(&event)?;
                }
            }
            Err(e) => emit(&StreamEvent::error(e.to_string()))?,
        }
    }

    Ok(())
}

/// Write one JSON line to stdout.
fn emit<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let line = serde_json::to_string(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;
    Ok(())
}
