//! ABOUTME: Embedding provider trait (C1) and a deterministic offline implementation
//! ABOUTME: Concrete vendor SDKs (OpenAI, Cohere, ...) are out of scope; see SPEC_FULL.md

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use grag_core::Embedding;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Deterministic text -> vector embedding, vendor-agnostic.
///
/// Implementations must be deterministic: the same text must always embed
/// to the same vector for a fixed provider configuration, and `dimensions()`
/// must be constant across calls.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. The result preserves input order.
    ///
    /// # Errors
    /// Returns [`ProviderError::Embedding`] if the backend call fails.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text; default implementation batches through [`embed`](Self::embed).
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut batch = self.embed(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| ProviderError::Embedding {
                provider: self.name().to_string(),
                message: "provider returned no embeddings for a one-item batch".to_string(),
            })
    }

    /// Fixed embedding dimension for this provider configuration.
    fn dimensions(&self) -> usize;

    /// Provider name, for error messages and logging.
    fn name(&self) -> &str;
}

/// Offline, hash-based embedding provider. Useful for tests and for running
/// the pipeline without network credentials: the vector is a deterministic
/// function of the text and has no semantic content.
#[derive(Debug, Clone)]
pub struct DeterministicEmbeddingProvider {
    name: String,
    dimensions: usize,
}

impl DeterministicEmbeddingProvider {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            name: "deterministic".to_string(),
            dimensions,
        }
    }

    #[must_use]
    pub fn from_config(config: &ProviderConfig, dimensions: usize) -> Self {
        Self {
            name: config.name.clone(),
            dimensions,
        }
    }

    fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let hashed = hasher.finish();
            // map u64 to [-1, 1]
            #[allow(clippy::cast_precision_loss)]
            let value = (hashed % 2_000_001) as f32 / 1_000_000.0 - 1.0;
            vector.push(value);
        }
        normalize(&mut vector);
        vector
    }
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        debug!(count = texts.len(), "embedding batch (deterministic)");
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 for
/// zero-norm vectors or mismatched lengths rather than panicking.
#[must_use]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_embeddings_are_stable() {
        let provider = DeterministicEmbeddingProvider::new(16);
        let a = provider.embed_one("Alice works for Acme").await.unwrap();
        let b = provider.embed_one("Alice works for Acme").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn different_text_yields_different_vector() {
        let provider = DeterministicEmbeddingProvider::new(16);
        let a = provider.embed_one("Alice").await.unwrap();
        let b = provider.embed_one("Bob").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.4, 0.5];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_similarity_handles_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
