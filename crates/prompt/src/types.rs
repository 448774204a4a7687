//! Prompt types for ragchat.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System instruction sent ahead of the user turn
    #[serde(default)]
    pub system: String,

    /// User turn template with Handlebars syntax.
    ///
    /// Available variables: `history`, `context`, `query`.
    pub template: String,
}

/// One retrieved passage as it appears in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPassage {
    /// Source identifier (file path)
    pub source: String,

    /// Similarity score, higher is better
    pub score: f32,

    /// Passage text
    pub text: String,
}

impl ContextPassage {
    pub fn new(source: impl Into<String>, score: f32, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            score,
            text: text.into(),
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of retrieved passages in the context block
    #[serde(rename = "passageCount")]
    pub passage_count: usize,

    /// Whether previous turns were included
    #[serde(rename = "historyIncluded")]
    pub history_included: bool,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: rag
title: Terse answers
apiVersion: "1.0"
system: "Answer in one sentence."
template: "{{context}}Q: {{query}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "rag");
        assert_eq!(def.system, "Answer in one sentence.");
        assert_eq!(def.template, "{{context}}Q: {{query}}");
    }

    #[test]
    fn test_system_defaults_to_empty() {
        let yaml = "id: x\ntitle: X\napiVersion: \"1.0\"\ntemplate: \"{{query}}\"\n";
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.system.is_empty());
    }
}
