//! The generation bridge.
//!
//! Answers one query at a time, either as a whole response or as a stream
//! of fragments relayed from a worker task. Conversation history is updated
//! once per successful answer and never from a failed or abandoned one.

use crate::config::ChatConfig;
use crate::embeddings::QueryEmbeddingCache;
use crate::knowledge_base::KnowledgeBase;
use crate::rag::assembler::{PromptAssembler, PromptRequest};
use crate::rag::stream::ResponseStream;
use crate::rag::types::{ChatReply, ChatRequest, ChatResponse, StreamEvent};
use futures::StreamExt;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::{LlmClient, LlmRequest};
use ragchat_prompt::{ConversationHistory, ConversationTurn, PromptDefinition};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Prefix of the assistant reply when a non-streamed answer fails.
pub const ERROR_REPLY_PREFIX: &str = "I encountered an error while processing your request: ";

/// Frames buffered between the worker and the caller.
const STREAM_BUFFER: usize = 32;

/// Model and sampling parameters for generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationSettings {
    /// The chat config's model wins over `default_model`.
    pub fn from_chat_config(chat: &ChatConfig, default_model: &str) -> Self {
        Self {
            model: chat
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            temperature: chat.temperature,
            max_tokens: chat.max_tokens,
        }
    }

    fn request(&self, prompt: &PromptRequest) -> LlmRequest {
        let request = LlmRequest::new(prompt.user.as_str(), self.model.as_str())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        match &prompt.system {
            Some(system) => request.with_system(system.as_str()),
            None => request,
        }
    }
}

/// One conversation over one knowledge base.
///
/// The embedding and generation providers are injected, so tests can run
/// the whole pipeline against deterministic fakes.
pub struct RagService {
    assembler: PromptAssembler,
    llm: Arc<dyn LlmClient>,
    settings: GenerationSettings,
    history: Arc<Mutex<ConversationHistory>>,
}

impl RagService {
    /// Wrap an already loaded knowledge base.
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: GenerationSettings,
    ) -> Self {
        let config = knowledge.config();
        let cache = Arc::new(QueryEmbeddingCache::with_capacity(
            Arc::clone(knowledge.provider()),
            config.chat.query_cache_size,
        ));
        let history = ConversationHistory::new(config.chat.max_history);
        let top_k = config.retrieval.top_k;

        Self {
            assembler: PromptAssembler::new(cache, knowledge, prompt, top_k),
            llm,
            settings,
            history: Arc::new(Mutex::new(history)),
        }
    }

    /// Load or build the index, then start the service.
    ///
    /// Fails when the index cannot be initialized; no service exists then.
    pub async fn start(
        mut knowledge: KnowledgeBase,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: GenerationSettings,
    ) -> AppResult<Self> {
        knowledge.load_or_build().await?;
        Ok(Self::new(Arc::new(knowledge), llm, prompt, settings))
    }

    /// Answer `query` in one piece.
    ///
    /// Failures become a user-facing error reply and leave history as is.
    pub async fn respond(&self, query: &str) -> String {
        match self.try_respond(query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Error generating response: {}", e);
                format!("{}{}", ERROR_REPLY_PREFIX, e)
            }
        }
    }

    /// Answer `query` in one piece, propagating failures.
    pub async fn try_respond(&self, query: &str) -> AppResult<String> {
        let history_text = self.history.lock().await.render();
        let prompt = self.assembler.assemble(query, &history_text).await?;

        let response = self.llm.complete(&self.settings.request(&prompt)).await?;
        let answer = response.content;

        self.history.lock().await.record(query, answer.as_str());
        Ok(answer)
    }

    /// Answer `query` as a stream of frames.
    ///
    /// Must be called within a Tokio runtime. The returned stream always
    /// ends with one `Done` frame unless it is dropped early.
    pub fn respond_stream(&self, query: impl Into<String>) -> ResponseStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let worker = StreamWorker {
            assembler: self.assembler.clone(),
            llm: Arc::clone(&self.llm),
            settings: self.settings.clone(),
            history: Arc::clone(&self.history),
            query: query.into(),
            tx,
        };
        tokio::spawn(worker.run());
        ResponseStream::new(rx)
    }

    /// Answer a chat request in the mode it asks for.
    pub async fn handle(&self, request: ChatRequest) -> AppResult<ChatReply> {
        let query = request
            .latest_user_message()
            .ok_or_else(|| AppError::InvalidRequest("No user message provided".to_string()))?
            .to_string();

        if request.stream {
            Ok(ChatReply::Stream(self.respond_stream(query)))
        } else {
            let content = self.respond(&query).await;
            Ok(ChatReply::Complete(ChatResponse::assistant(content)))
        }
    }

    /// Forget the conversation. The query cache is kept.
    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
        tracing::info!("Conversation history cleared");
    }

    pub async fn clear_query_cache(&self) {
        self.assembler.cache().clear().await;
        tracing::info!("Query embedding cache cleared");
    }

    /// Snapshot of the retained turns, oldest first.
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().await.turns().cloned().collect()
    }

    pub fn query_cache(&self) -> &QueryEmbeddingCache {
        self.assembler.cache()
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        self.assembler.knowledge()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }
}

/// Everything one streamed answer needs, owned by its task.
struct StreamWorker {
    assembler: PromptAssembler,
    llm: Arc<dyn LlmClient>,
    settings: GenerationSettings,
    history: Arc<Mutex<ConversationHistory>>,
    query: String,
    tx: mpsc::Sender<StreamEvent>,
}

impl StreamWorker {
    async fn run(self) {
        match self.relay().await {
            Ok(Some(answer)) => {
                self.history.lock().await.record(self.query.as_str(), answer);
            }
            Ok(None) => {
                tracing::debug!("Stream abandoned by caller; history unchanged");
                return;
            }
            Err(e) => {
                tracing::error!("Error in streaming response: {}", e);
                let _ = self.tx.send(StreamEvent::error(e.to_string())).await;
            }
        }
        let _ = self.tx.send(StreamEvent::Done).await;
    }

    /// Relay fragments to the caller.
    ///
    /// Returns the full answer on a natural end, `None` once the caller has
    /// gone away.
    async fn relay(&self) -> AppResult<Option<String>> {
        let history_text = self.history.lock().await.render();
        let prompt = self.assembler.assemble(&self.query, &history_text).await?;

        let request = self.settings.request(&prompt).with_streaming();
        let mut stream = self.llm.stream(&request).await?;
        let mut answer = String::new();

        loop {
            let item = tokio::select! {
                item = stream.next() => item,
                _ = self.tx.closed() => return Ok(None),
            };
            let Some(chunk) = item else { break };
            let chunk = chunk?;

            if !chunk.content.is_empty() {
                answer.push_str(&chunk.content);
                if self.tx.send(StreamEvent::delta(chunk.content)).await.is_err() {
                    return Ok(None);
                }
            }
            if chunk.done {
                break;
            }
        }

        if self.tx.is_closed() {
            return Ok(None);
        }
        Ok(Some(answer))
    }
}
