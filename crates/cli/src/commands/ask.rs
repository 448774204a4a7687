//! Ask command handler.
//!
//! Answers one question about the corpus, streamed to stdout by default.

use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::{KnowledgeConfig, RagService, StreamEvent};
use std::io::Write;

use super::start_service;

/// Ask a single question about the corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question
    pub query: String,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        if self.query.trim().is_empty() {
            return Err(AppError::InvalidRequest("Query must not be empty".to_string()));
        }

        let mut knowledge = KnowledgeConfig::load(&config.workspace)?;
        if let Some(top_k) = self.top_k {
            knowledge.retrieval.top_k = top_k;
            knowledge.validate()?;
        }

        let service = start_service(config, knowledge).await?;

        let answer = if self.no_stream || self.json {
            service.try_respond(&self.query).await?
        } else {
            stream_to_stdout(&service, &self.query).await?
        };

        if self.json {
            let output = serde_json::json!({
                "answer": answer,
                "model": service.settings().model,
                "provider": config.provider,
                "topK": service.knowledge().config().retrieval.top_k,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if self.no_stream {
            println!("{}", answer);
        }

        Ok(())
    }
}

/// Print fragments as they arrive and return the full answer.
pub(crate) async fn stream_to_stdout(service: &RagService, query: &str) -> AppResult<String> {
    let mut stream = service.respond_stream(query);
    let mut answer = String::new();
    let mut failure = None;

    while let Some(event) = stream.next_event().await {
        match event {
            StreamEvent::Delta { content } => {
                print!("{}", content);
                std::io::stdout().flush().ok();
                answer.push_str(&content);
            }
            StreamEvent::Error { message } => failure = Some(message),
            StreamEvent::Done => break,
        }
    }
    println!();

    match failure {
        Some(message) => Err(AppError::Provider(message)),
        None => Ok(answer),
    }
}
