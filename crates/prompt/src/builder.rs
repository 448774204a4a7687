//! Prompt builder for rendering templates and injecting context.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, ContextPassage, PromptDefinition};
use handlebars::Handlebars;
use ragchat_core::{AppError, AppResult};
use std::collections::HashMap;

/// Header that opens the retrieved-context block.
pub const CONTEXT_HEADER: &str = "Here is the relevant context from the documents:\n\n";

/// Format retrieved passages for inclusion in the prompt.
///
/// Each passage is introduced by its source and its score with two decimals.
pub fn format_context(passages: &[ContextPassage]) -> String {
    let mut context = String::from(CONTEXT_HEADER);
    for passage in passages {
        context.push_str(&format!(
            "From {} (relevance: {:.2}):\n",
            passage.source, passage.score
        ));
        context.push_str(&passage.text);
        context.push_str("\n\n");
    }
    context
}

/// Build the retrieval prompt for one query.
///
/// # Arguments
/// * `definition` - Prompt definition (built-in or workspace override)
/// * `query` - The current question
/// * `history` - Rendered conversation history, possibly empty
/// * `passages` - Retrieved passages, best first
///
/// # Example
/// ```no_run
/// use ragchat_prompt::{build_prompt, default_rag_prompt, ContextPassage};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let passages = vec![ContextPassage::new("data/a.pdf", 0.91, "Alpha Beta")];
/// let built = build_prompt(&default_rag_prompt(), "What is Alpha?", "", &passages)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    query: &str,
    history: &str,
    passages: &[ContextPassage],
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut variables = HashMap::new();
    variables.insert("history".to_string(), history.to_string());
    variables.insert("context".to_string(), format_context(passages));
    variables.insert("query".to_string(), query.to_string());

    let user = render_template(&definition.template, &variables)?;
    let system = if definition.system.trim().is_empty() {
        None
    } else {
        Some(definition.system.clone())
    };

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            passage_count: passages.len(),
            history_included: !history.is_empty(),
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
