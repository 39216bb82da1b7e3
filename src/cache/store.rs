//! Vector store collaborators for the similarity cache

use crate::models::ModelResponse;
use crate::utils::error::AiResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::RwLock;

/// One cached response with its prompt embedding. Entries are only ever
/// inserted or evicted, never mutated.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Embedding of the normalized prompt
    pub vector: Vec<f32>,
    /// The normalized prompt text the embedding was computed from
    pub prompt: String,
    /// The stored response
    pub response: ModelResponse,
    /// When the entry was inserted
    pub inserted_at: DateTime<Utc>,
}

/// Pluggable vector store
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a new entry
    async fn insert(&self, vector: Vec<f32>, prompt: String, response: ModelResponse)
        -> AiResult<()>;

    /// Nearest stored entry by cosine similarity, with its similarity,
    /// or `None` when the store is empty
    async fn nearest(&self, vector: &[f32]) -> AiResult<Option<(CacheEntry, f32)>>;

    /// Number of stored entries
    async fn len(&self) -> usize;

    /// Whether the store holds no entries
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Cosine similarity of two vectors; 0.0 when either has zero magnitude
/// or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Default in-memory store: linear cosine scan over an insertion-ordered
/// deque, with optional oldest-first eviction when `max_entries` is set.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    entries: RwLock<VecDeque<CacheEntry>>,
    max_entries: Option<usize>,
}

impl InMemoryVectorStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: None,
        }
    }

    /// Store bounded to `max_entries`; the oldest entry is evicted when
    /// the bound is exceeded
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: Some(max_entries),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(
        &self,
        vector: Vec<f32>,
        prompt: String,
        response: ModelResponse,
    ) -> AiResult<()> {
        let mut entries = self.entries.write().expect("vector store lock poisoned");
        entries.push_back(CacheEntry {
            vector,
            prompt,
            response,
            inserted_at: Utc::now(),
        });
        if let Some(max) = self.max_entries {
            while entries.len() > max {
                entries.pop_front();
            }
        }
        Ok(())
    }

    async fn nearest(&self, vector: &[f32]) -> AiResult<Option<(CacheEntry, f32)>> {
        let entries = self.entries.read().expect("vector store lock poisoned");
        let mut best: Option<(&CacheEntry, f32)> = None;
        for entry in entries.iter() {
            let similarity = cosine_similarity(vector, &entry.vector);
            match best {
                Some((_, best_similarity)) if similarity <= best_similarity => {}
                _ => best = Some((entry, similarity)),
            }
        }
        Ok(best.map(|(entry, similarity)| (entry.clone(), similarity)))
    }

    async fn len(&self) -> usize {
        self.entries.read().expect("vector store lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // Mismatched dimensions and zero vectors are dissimilar, not errors
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_nearest_returns_best_match() {
        let store = InMemoryVectorStore::new();
        store
            .insert(
                vec![1.0, 0.0],
                "a".to_string(),
                ModelResponse::from_text("a", "t"),
            )
            .await
            .unwrap();
        store
            .insert(
                vec![0.6, 0.8],
                "b".to_string(),
                ModelResponse::from_text("b", "t"),
            )
            .await
            .unwrap();

        let (entry, similarity) = store.nearest(&[0.0, 1.0]).await.unwrap().unwrap();
        assert_eq!(entry.prompt, "b");
        assert!((similarity - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_empty_store_has_no_nearest() {
        let store = InMemoryVectorStore::new();
        assert!(store.nearest(&[1.0]).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_eviction_oldest_first() {
        let store = InMemoryVectorStore::with_max_entries(2);
        for name in ["first", "second", "third"] {
            store
                .insert(
                    vec![1.0],
                    name.to_string(),
                    ModelResponse::from_text(name, "t"),
                )
                .await
                .unwrap();
        }
        assert_eq!(store.len().await, 2);
        // "first" was evicted; "second" and "third" remain
        let entries = store.entries.read().unwrap();
        assert_eq!(entries[0].prompt, "second");
        assert_eq!(entries[1].prompt, "third");
    }
}
