//! Command handlers for the ragchat CLI.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::{
    create_provider, GenerationSettings, KnowledgeBase, KnowledgeConfig, ProgressEvent,
    ProgressReporter, RagService,
};
use ragchat_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Knowledge base for the workspace, not yet loaded.
pub(crate) fn knowledge_base(
    config: &AppConfig,
    knowledge: KnowledgeConfig,
    progress: ProgressReporter,
) -> AppResult<KnowledgeBase> {
    let provider = create_provider(&knowledge.embedding, config.api_key.as_deref())?;
    tracing::debug!(
        "Embedding provider: {} ({}, {} dims)",
        provider.provider_name(),
        provider.model_name(),
        provider.dimensions()
    );
    Ok(KnowledgeBase::new(&config.workspace, knowledge, provider).with_progress(progress))
}

/// Generation client for the active provider.
pub(crate) fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    config.validate()?;
    let api_key = config.resolve_api_key(&config.provider);
    let endpoint = config.endpoint();
    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref()).map_err(AppError::Config)
}

/// Load or build the index and start a chat service over it.
pub(crate) async fn start_service(
    config: &AppConfig,
    knowledge: KnowledgeConfig,
) -> AppResult<RagService> {
    let settings = GenerationSettings::from_chat_config(&knowledge.chat, &config.model);
    let kb = knowledge_base(config, knowledge, stderr_progress())?;
    let llm = llm_client(config)?;
    let prompt = ragchat_prompt::load_rag_prompt(&config.workspace)?;

    tracing::info!(
        "Starting chat service with {} / {}",
        config.provider,
        settings.model
    );
    RagService::start(kb, llm, prompt, settings)
        .await
        .inspect_err(|e| {
            if e.is_fatal_for_startup() {
                tracing::error!("Index initialization failed, not accepting queries: {}", e);
            }
        })
}

/// Progress lines on stderr, keeping stdout for answers.
pub(crate) fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
}
