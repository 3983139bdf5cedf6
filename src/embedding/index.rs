//! Memoized nearest-neighbour and similarity queries
//!
//! Model queries are CPU-bound, so they run on the blocking pool under a
//! timeout. A query that times out or panics degrades to "no answer" for
//! that call and is not memoized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::vectors::WordVectorModel;
use crate::config::EmbeddingConfig;

/// Shared model type
pub type SharedModel = Arc<dyn WordVectorModel>;

/// Caching front of a word-vector model
pub struct EmbeddingIndex {
    model: SharedModel,
    timeout: Duration,
    nearest_cache: RwLock<HashMap<(String, usize), Arc<Vec<String>>>>,
    similarity_cache: RwLock<HashMap<(String, String), Option<f64>>>,
}

impl EmbeddingIndex {
    pub fn new(model: SharedModel, config: &EmbeddingConfig) -> Self {
        Self {
            model,
            timeout: config.query_timeout(),
            nearest_cache: RwLock::new(HashMap::new()),
            similarity_cache: RwLock::new(HashMap::new()),
        }
    }

    /// The `k` nearest words to `word`, most similar first.
    pub async fn nearest(&self, word: &str, k: usize) -> Arc<Vec<String>> {
        let key = (word.to_string(), k);
        {
            let cache = self.nearest_cache.read().await;
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        let model = self.model.clone();
        let query = word.to_string();
        let Some(words) = self.run_blocking(move || model.nearest(&query, k)).await else {
            return Arc::new(Vec::new());
        };

        debug!(word, k, neighbours = words.len(), "Nearest words computed");
        let mut cache = self.nearest_cache.write().await;
        cache.entry(key).or_insert_with(|| Arc::new(words)).clone()
    }

    /// Cosine similarity; `None` when either word is unknown or the query
    /// did not complete.
    pub async fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let key = pair_key(a, b);
        {
            let cache = self.similarity_cache.read().await;
            if let Some(hit) = cache.get(&key) {
                return *hit;
            }
        }

        let model = self.model.clone();
        let (x, y) = key.clone();
        let similarity = self.run_blocking(move || model.similarity(&x, &y)).await?;

        let mut cache = self.similarity_cache.write().await;
        *cache.entry(key).or_insert(similarity)
    }

    async fn run_blocking<T, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.timeout, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(error = %e, "Embedding query failed");
                None
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Embedding query timed out");
                None
            }
        }
    }

    /// (nearest entries, similarity entries) currently memoized
    pub async fn cache_sizes(&self) -> (usize, usize) {
        (
            self.nearest_cache.read().await.len(),
            self.similarity_cache.read().await.len(),
        )
    }
}

/// Similarity is symmetric, so both orders share one cache entry.
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
