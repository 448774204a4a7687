//! Retrieval-augmented chat: prompt assembly and the generation bridge.

pub mod assembler;
pub mod service;
pub mod stream;
pub mod types;

pub use assembler::{PromptAssembler, PromptRequest};
pub use service::{GenerationSettings, RagService, ERROR_REPLY_PREFIX};
pub use stream::ResponseStream;
pub use types::{ChatMessage, ChatReply, ChatRequest, ChatResponse, StreamEvent};
