//! Similarity cache integration tests

use aidispatch::cache::{cosine_similarity, Embedder};
use aidispatch::{
    AiResult, ChatRequest, InMemoryVectorStore, ModelResponse, SimilarityCache,
    SimilarityCacheConfig,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

// Maps each distinct normalized prompt to its own orthogonal axis, so
// distinct prompts never collide and identical prompts always hit.
struct AxisEmbedder {
    seen: Mutex<Vec<String>>,
}

impl AxisEmbedder {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Embedder for AxisEmbedder {
    async fn embed(&self, text: &str) -> AiResult<Vec<f32>> {
        let mut seen = self.seen.lock().unwrap();
        let axis = match seen.iter().position(|s| s == text) {
            Some(i) => i,
            None => {
                seen.push(text.to_string());
                seen.len() - 1
            }
        };
        let mut vector = vec![0.0; 8];
        vector[axis] = 1.0;
        Ok(vector)
    }
}

#[tokio::test]
async fn test_identical_prompt_hits() {
    let cache = SimilarityCache::new(Arc::new(AxisEmbedder::new()), SimilarityCacheConfig::default());
    let request = ChatRequest::from_prompt("gpt-4o", "What is Rust?");
    cache
        .insert(&request, &ModelResponse::from_text("a language", "gpt-4o"))
        .await
        .unwrap();

    let hit = cache.lookup(&request).await.unwrap().unwrap();
    assert_eq!(hit.text, "a language");
}

#[tokio::test]
async fn test_prompt_normalization_bridges_formatting() {
    let cache = SimilarityCache::new(Arc::new(AxisEmbedder::new()), SimilarityCacheConfig::default());
    let original = ChatRequest::from_prompt("gpt-4o", "What is Rust?");
    cache
        .insert(&original, &ModelResponse::from_text("a language", "gpt-4o"))
        .await
        .unwrap();

    // Case and whitespace differences normalize to the same prompt
    let reformatted = ChatRequest::from_prompt("gpt-4o", "  WHAT   is\trust? ");
    let hit = cache.lookup(&reformatted).await.unwrap().unwrap();
    assert_eq!(hit.text, "a language");
}

#[tokio::test]
async fn test_similarity_at_threshold_is_a_hit() {
    // Identical vectors give similarity 1.0, matching threshold 1.0
    let cache = SimilarityCache::new(
        Arc::new(AxisEmbedder::new()),
        SimilarityCacheConfig { threshold: 1.0 },
    );
    let request = ChatRequest::from_prompt("gpt-4o", "exact");
    cache
        .insert(&request, &ModelResponse::from_text("stored", "gpt-4o"))
        .await
        .unwrap();
    assert!(cache.lookup(&request).await.unwrap().is_some());
}

#[tokio::test]
async fn test_distinct_prompts_never_collide() {
    let cache = SimilarityCache::new(Arc::new(AxisEmbedder::new()), SimilarityCacheConfig::default());
    let a = ChatRequest::from_prompt("gpt-4o", "first question");
    cache
        .insert(&a, &ModelResponse::from_text("first answer", "gpt-4o"))
        .await
        .unwrap();

    let b = ChatRequest::from_prompt("gpt-4o", "second question");
    assert!(cache.lookup(&b).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bounded_store_evicts_oldest_first() {
    let store = Arc::new(InMemoryVectorStore::with_max_entries(2));
    let cache = SimilarityCache::with_store(
        Arc::new(AxisEmbedder::new()),
        store,
        SimilarityCacheConfig::default(),
    );

    let first = ChatRequest::from_prompt("gpt-4o", "first");
    let second = ChatRequest::from_prompt("gpt-4o", "second");
    let third = ChatRequest::from_prompt("gpt-4o", "third");
    for (request, answer) in [(&first, "one"), (&second, "two"), (&third, "three")] {
        cache
            .insert(request, &ModelResponse::from_text(answer, "gpt-4o"))
            .await
            .unwrap();
    }

    assert_eq!(cache.len().await, 2);
    // Oldest entry is gone, the two newest remain
    assert!(cache.lookup(&first).await.unwrap().is_none());
    assert_eq!(cache.lookup(&second).await.unwrap().unwrap().text, "two");
    assert_eq!(cache.lookup(&third).await.unwrap().unwrap().text, "three");
}

#[test]
fn test_cosine_similarity_edge_cases() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    // Dimension mismatch and zero vectors never match anything
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    let opposite = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
    assert!((opposite + 1.0).abs() < 1e-6);
}
