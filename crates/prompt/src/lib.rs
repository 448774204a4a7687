//! Prompt system for ragchat.
//!
//! This crate turns retrieved passages, the conversation window and the
//! current question into a system instruction plus a user turn:
//! - YAML-based prompt definitions with a built-in default
//! - Handlebars template rendering
//! - Bounded conversation history

pub mod builder;
pub mod history;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, format_context};
pub use history::{ConversationHistory, ConversationTurn, DEFAULT_MAX_HISTORY};
pub use loader::{default_rag_prompt, load_prompt, load_rag_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, ContextPassage, PromptDefinition};
