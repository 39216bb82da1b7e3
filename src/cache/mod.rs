//! Similarity cache
//!
//! Semantic response cache consulted before any downstream dispatch. A
//! lookup embeds the request's normalized prompt and asks the vector
//! store for the nearest stored entry; a similarity at or above the
//! configured threshold short-circuits the pipeline with the stored
//! response. Entries are inserted only after successful dispatches.

pub mod store;

pub use store::{cosine_similarity, CacheEntry, InMemoryVectorStore, VectorStore};

use crate::models::{ChatRequest, ModelResponse};
use crate::utils::error::AiResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Embedding collaborator. Must be deterministic for identical input
/// within a session, or cache hits become unreliable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a normalized prompt
    async fn embed(&self, text: &str) -> AiResult<Vec<f32>>;
}

/// Similarity cache configuration
#[derive(Debug, Clone, Copy)]
pub struct SimilarityCacheConfig {
    /// Minimum cosine similarity for a hit
    pub threshold: f32,
}

impl Default for SimilarityCacheConfig {
    fn default() -> Self {
        Self { threshold: 0.95 }
    }
}

/// Semantic response cache over a pluggable embedder and vector store
pub struct SimilarityCache {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: SimilarityCacheConfig,
}

impl SimilarityCache {
    /// Create a cache with the default in-memory store
    pub fn new(embedder: Arc<dyn Embedder>, config: SimilarityCacheConfig) -> Self {
        Self::with_store(embedder, Arc::new(InMemoryVectorStore::new()), config)
    }

    /// Create a cache over a custom vector store
    pub fn with_store(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: SimilarityCacheConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Look up a request. Returns the stored response when the nearest
    /// entry's similarity meets the threshold; a near-miss below the
    /// threshold is never returned.
    pub async fn lookup(&self, request: &ChatRequest) -> AiResult<Option<ModelResponse>> {
        let prompt = request.normalized_prompt();
        let vector = self.embedder.embed(&prompt).await?;
        match self.store.nearest(&vector).await? {
            Some((entry, similarity)) if similarity >= self.config.threshold => {
                debug!(
                    similarity,
                    threshold = self.config.threshold,
                    "Similarity cache hit"
                );
                Ok(Some(entry.response))
            }
            Some((_, similarity)) => {
                debug!(
                    similarity,
                    threshold = self.config.threshold,
                    "Similarity cache miss"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Insert a successful response keyed by the request's prompt
    /// embedding
    pub async fn insert(&self, request: &ChatRequest, response: &ModelResponse) -> AiResult<()> {
        let prompt = request.normalized_prompt();
        let vector = self.embedder.embed(&prompt).await?;
        self.store.insert(vector, prompt, response.clone()).await
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Deterministic embedder mapping known prompts to fixed vectors
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> AiResult<Vec<f32>> {
            Ok(match text {
                t if t.contains("capital of france") => vec![1.0, 0.0, 0.0],
                t if t.contains("france's capital") => vec![0.99, 0.14, 0.0],
                _ => vec![0.0, 0.0, 1.0],
            })
        }
    }

    fn cache(threshold: f32) -> SimilarityCache {
        SimilarityCache::new(Arc::new(StubEmbedder), SimilarityCacheConfig { threshold })
    }

    #[tokio::test]
    async fn test_hit_above_threshold() {
        let cache = cache(0.95);
        let first = ChatRequest::from_prompt("gpt-4o", "Capital of France?");
        let response = ModelResponse::from_text("Paris", "gpt-4o");
        cache.insert(&first, &response).await.unwrap();

        let paraphrase = ChatRequest::from_prompt("gpt-4o", "France's capital?");
        let hit = cache.lookup(&paraphrase).await.unwrap().unwrap();
        assert_eq!(hit.text, "Paris");
    }

    #[tokio::test]
    async fn test_miss_below_threshold() {
        let cache = cache(0.95);
        let first = ChatRequest::from_prompt("gpt-4o", "Capital of France?");
        cache
            .insert(&first, &ModelResponse::from_text("Paris", "gpt-4o"))
            .await
            .unwrap();

        let unrelated = ChatRequest::from_prompt("gpt-4o", "How do I sort a vec?");
        assert!(cache.lookup(&unrelated).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_cache_misses() {
        let cache = cache(0.95);
        let request = ChatRequest::from_prompt("gpt-4o", "anything");
        assert!(cache.lookup(&request).await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_distinct_prompts_both_stored() {
        let cache = cache(0.95);
        let a = ChatRequest::from_prompt("gpt-4o", "Capital of France?");
        let b = ChatRequest::from_prompt("gpt-4o", "How do I sort a vec?");
        cache
            .insert(&a, &ModelResponse::from_text("Paris", "gpt-4o"))
            .await
            .unwrap();
        cache
            .insert(&b, &ModelResponse::from_text("sort()", "gpt-4o"))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 2);
    }
}
