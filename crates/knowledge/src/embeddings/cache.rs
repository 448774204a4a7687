//! Memoized query embeddings.

use crate::embeddings::EmbeddingProvider;
use ragchat_core::AppResult;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<Vec<f32>>>,
    /// Insertion order, used for eviction when bounded
    order: VecDeque<String>,
}

/// Caches query embeddings by exact query text.
///
/// The lock is held across the provider call, so concurrent requests for
/// the same new query compute it once. Failed computations are not cached.
#[derive(Debug)]
pub struct QueryEmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    max_entries: Option<usize>,
    state: Mutex<CacheState>,
}

impl QueryEmbeddingCache {
    /// Unbounded cache.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_capacity(provider, None)
    }

    /// Cache holding at most `max_entries` queries, evicting the oldest.
    pub fn with_capacity(provider: Arc<dyn EmbeddingProvider>, max_entries: Option<usize>) -> Self {
        Self {
            provider,
            max_entries: max_entries.map(|n| n.max(1)),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Return the cached embedding for `query`, computing it on a miss.
    pub async fn get_or_compute(&self, query: &str) -> AppResult<Arc<Vec<f32>>> {
        let mut state = self.state.lock().await;

        if let Some(hit) = state.entries.get(query) {
            tracing::debug!("Query embedding cache hit");
            return Ok(Arc::clone(hit));
        }

        let embedding = Arc::new(self.provider.embed(query).await?);

        if let Some(max) = self.max_entries {
            while state.entries.len() >= max {
                match state.order.pop_front() {
                    Some(oldest) => {
                        state.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        state.order.push_back(query.to_string());
        state
            .entries
            .insert(query.to_string(), Arc::clone(&embedding));
        tracing::debug!("Cached query embedding ({} entries)", state.entries.len());

        Ok(embedding)
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.order.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn provider_name(&self) -> &str {
            "counting"
        }
        fn model_name(&self) -> &str {
            "counting-v1"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|t| t == "fail") {
                return Err(AppError::Provider("boom".to_string()));
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_repeated_query_embeds_once() {
        let provider = Arc::new(CountingProvider::default());
        let cache = QueryEmbeddingCache::new(provider.clone());

        let a = cache.get_or_compute("what is alpha").await.unwrap();
        let b = cache.get_or_compute("what is alpha").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        cache.get_or_compute("what is beta").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_compute_once() {
        let provider = Arc::new(CountingProvider::default());
        let cache = Arc::new(QueryEmbeddingCache::new(provider.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_compute("same").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let provider = Arc::new(CountingProvider::default());
        let cache = QueryEmbeddingCache::new(provider.clone());

        assert!(cache.get_or_compute("fail").await.is_err());
        assert!(cache.is_empty().await);
        assert!(cache.get_or_compute("fail").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bounded_cache_evicts_oldest() {
        let provider = Arc::new(CountingProvider::default());
        let cache = QueryEmbeddingCache::with_capacity(provider.clone(), Some(2));

        cache.get_or_compute("one").await.unwrap();
        cache.get_or_compute("two").await.unwrap();
        cache.get_or_compute("three").await.unwrap();
        assert_eq!(cache.len().await, 2);

        // "one" was evicted, "three" was not
        cache.get_or_compute("three").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        cache.get_or_compute("one").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_clear() {
        let provider = Arc::new(CountingProvider::default());
        let cache = QueryEmbeddingCache::new(provider.clone());

        cache.get_or_compute("q").await.unwrap();
        cache.clear().await;
        assert!(cache.is_empty().await);
        cache.get_or_compute("q").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
