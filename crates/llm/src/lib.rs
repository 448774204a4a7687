//! Generation provider integration for ragchat.
//!
//! This crate provides a provider-agnostic abstraction for text generation.
//! Every backend implements [`LlmClient`], which offers a whole-response call
//! and an incremental streaming call.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: OpenAI, Together AI and other chat completions APIs
//! - **Blocking adapter**: wraps synchronous providers so their token iterator
//!   runs off the async runtime
//!
//! # Example
//! ```no_run
//! use ragchat_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod factory;
pub mod framing;
pub mod providers;
pub mod types;

// Re-export main types
pub use blocking::{BlockingAdapter, BlockingLlmClient, FragmentIter};
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
