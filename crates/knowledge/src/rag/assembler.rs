//! Retrieval plus prompt construction for one query.

use crate::embeddings::QueryEmbeddingCache;
use crate::knowledge_base::KnowledgeBase;
use crate::types::SearchResult;
use ragchat_core::AppResult;
use ragchat_prompt::{build_prompt, ContextPassage, PromptDefinition};
use std::sync::Arc;

/// A prompt ready for the generation backend.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub system: Option<String>,
    pub user: String,

    /// Retrieved chunks, best first
    pub results: Vec<SearchResult>,
}

/// Embeds the query through the cache, searches the index and renders the
/// prompt around the results and the conversation so far.
#[derive(Clone)]
pub struct PromptAssembler {
    cache: Arc<QueryEmbeddingCache>,
    knowledge: Arc<KnowledgeBase>,
    definition: Arc<PromptDefinition>,
    top_k: usize,
}

impl PromptAssembler {
    pub fn new(
        cache: Arc<QueryEmbeddingCache>,
        knowledge: Arc<KnowledgeBase>,
        definition: PromptDefinition,
        top_k: usize,
    ) -> Self {
        Self {
            cache,
            knowledge,
            definition: Arc::new(definition),
            top_k,
        }
    }

    pub async fn assemble(&self, query: &str, history: &str) -> AppResult<PromptRequest> {
        let embedding = self.cache.get_or_compute(query).await?;
        let results = self.knowledge.search(&embedding, self.top_k)?;

        if let Some(best) = results.first() {
            tracing::info!(
                "Retrieved {} chunks (top score {:.3} from {})",
                results.len(),
                best.score,
                best.chunk.source()
            );
        }

        let passages: Vec<ContextPassage> = results
            .iter()
            .map(|r| ContextPassage::new(r.chunk.source(), r.score, r.chunk.text.as_str()))
            .collect();

        let built = build_prompt(&self.definition, query, history, &passages)?;

        Ok(PromptRequest {
            system: built.system,
            user: built.user,
            results,
        })
    }

    pub fn cache(&self) -> &Arc<QueryEmbeddingCache> {
        &self.cache
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
