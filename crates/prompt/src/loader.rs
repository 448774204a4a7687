//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use ragchat_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the retrieval prompt.
pub const RAG_PROMPT_ID: &str = "rag";

const RAG_SYSTEM: &str = "You are a helpful assistant that answers questions based on the provided context and conversation history.
Use the following context and conversation history to answer the question.
If the context doesn't contain relevant information, say so.
Maintain consistency with previous responses and use the conversation history to understand context.";

const RAG_TEMPLATE: &str = "{{history}}{{context}}Current Question: {{query}}\n\nAnswer:";

/// The built-in retrieval prompt.
pub fn default_rag_prompt() -> PromptDefinition {
    PromptDefinition {
        id: RAG_PROMPT_ID.to_string(),
        title: "Retrieval-augmented answer".to_string(),
        api_version: "1.0".to_string(),
        system: RAG_SYSTEM.to_string(),
        template: RAG_TEMPLATE.to_string(),
    }
}

/// Load the retrieval prompt, preferring a workspace override.
///
/// Looks for `.ragchat/prompts/rag.yml`; falls back to [`default_rag_prompt`]
/// when the file is absent. A present but invalid file is an error.
pub fn load_rag_prompt(workspace_path: &Path) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", RAG_PROMPT_ID));
    if !prompt_file.exists() {
        tracing::debug!("Using built-in retrieval prompt");
        return Ok(default_rag_prompt());
    }
    load_prompt(workspace_path, RAG_PROMPT_ID)
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.ragchat/prompts/` directory.
///
/// # Example
/// ```no_run
/// use ragchat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

fn prompts_dir(workspace_path: &Path) -> std::path::PathBuf {
    workspace_path
        .join(ragchat_core::config::STATE_DIR)
        .join("prompts")
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if !def.template.contains("{{query}}") {
        return Err(AppError::Prompt(format!(
            "Prompt {} never references {{{{query}}}}",
            def.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) -> PathBuf {
        let prompts_dir = dir.join(".ragchat/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    const VALID: &str = r#"
id: rag
title: "Short answers"
apiVersion: "1.0"
system: "Answer briefly."
template: "{{context}}Q: {{query}}"
"#;

    #[test]
    fn test_default_when_no_override() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_rag_prompt(temp_dir.path()).unwrap();
        assert_eq!(prompt.id, "rag");
        assert!(prompt.system.starts_with("You are a helpful assistant"));
    }

    #[test]
    fn test_override_is_loaded() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag", VALID);

        let prompt = load_rag_prompt(temp_dir.path()).unwrap();
        assert_eq!(prompt.title, "Short answers");
        assert_eq!(prompt.system, "Answer briefly.");
    }

    #[test]
    fn test_invalid_override_is_error() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag", "invalid: yaml: content:");
        assert!(load_rag_prompt(temp_dir.path()).is_err());
    }

    #[test]
    fn test_template_must_use_query() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "rag",
            "id: rag\ntitle: T\napiVersion: \"1.0\"\ntemplate: \"{{context}}\"\n",
        );
        let err = load_rag_prompt(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("{{query}}"));
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }
}
