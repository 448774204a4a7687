//! Adapter for synchronous generation providers.
//!
//! Some backends (local model bindings, vendor SDKs without async support)
//! only expose a blocking call and a blocking token iterator. Driving them
//! directly from the async runtime would stall every other task, so the
//! adapter moves the iteration onto the blocking thread pool and relays
//! fragments through a bounded channel.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use futures::stream;
use ragchat_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Blocking iterator of generated text fragments.
pub type FragmentIter = Box<dyn Iterator<Item = AppResult<String>> + Send>;

/// A generation provider whose calls block the current thread.
pub trait BlockingLlmClient: Send + Sync + 'static {
    fn provider_name(&self) -> &str;

    /// Produce the whole response.
    fn complete(&self, request: &LlmRequest) -> AppResult<String>;

    /// Produce fragments lazily; each `next()` may block.
    fn stream(&self, request: &LlmRequest) -> AppResult<FragmentIter>;
}

/// Exposes a [`BlockingLlmClient`] as an async [`LlmClient`].
pub struct BlockingAdapter<T> {
    inner: Arc<T>,
    buffer: usize,
}

impl<T: BlockingLlmClient> BlockingAdapter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
            buffer: 16,
        }
    }

    /// Set how many fragments may queue before the producer waits.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::Provider(format!("Blocking provider task failed: {}", e))
}

#[async_trait::async_trait]
impl<T: BlockingLlmClient> LlmClient for BlockingAdapter<T> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let inner = Arc::clone(&self.inner);
        let owned = request.clone();
        let content = tokio::task::spawn_blocking(move || inner.complete(&owned))
            .await
            .map_err(join_error)??;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let inner = Arc::clone(&self.inner);
        let owned = request.clone();
        let fragments = tokio::task::spawn_blocking(move || inner.stream(&owned))
            .await
            .map_err(join_error)??;

        let (tx, rx) = mpsc::channel::<AppResult<String>>(self.buffer);
        tokio::task::spawn_blocking(move || {
            for fragment in fragments {
                let failed = fragment.is_err();
                // Receiver dropped: the consumer stopped listening.
                if tx.blocking_send(fragment).is_err() || failed {
                    break;
                }
            }
        });

        let model = request.model.clone();
        let chunks = stream::unfold((rx, model), |(mut rx, model)| async move {
            let next = rx.recv().await?;
            let item = next.map(|text| LlmStreamChunk::delta(text, model.clone()));
            Some((item, (rx, model)))
        });

        Ok(Box::pin(chunks))
    }
}
