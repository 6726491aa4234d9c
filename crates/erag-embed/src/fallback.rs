//! Deterministic, network-free embeddings
//!
//! The fallback embedder is the floor of the embedding pipeline: it is a pure
//! function of the lower-cased input text and never fails.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use erag_core::{EmbeddingProvider, ProviderError};

/// Width of fallback embeddings, matching MiniLM-class models.
pub const FALLBACK_DIMENSION: usize = 384;

/// Hash-based embedder used when no provider is reachable
#[derive(Debug, Clone)]
pub struct FallbackEmbedder {
    dimension: usize,
}

impl FallbackEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(FALLBACK_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text` without any I/O.
    ///
    /// SHA-256 digest bytes are spread cyclically over the output slots as
    /// `byte / 255 - 0.5`, then the vector is scaled to unit length.
    pub fn embed_deterministic(&self, text: &str) -> Vec<f32> {
        debug!("Creating deterministic embedding for text");
        let digest = Sha256::digest(text.to_lowercase().as_bytes());
        project_digest(&digest, self.dimension)
            .unwrap_or_else(|| pattern_embedding(text, self.dimension))
    }
}

impl Default for FallbackEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for FallbackEmbedder {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_deterministic(text))
    }
}

/// Map digest bytes onto `dimension` slots; `None` when there is no digest.
fn project_digest(digest: &[u8], dimension: usize) -> Option<Vec<f32>> {
    if digest.is_empty() {
        return None;
    }

    let mut embedding: Vec<f32> = (0..dimension)
        .map(|i| f32::from(digest[i % digest.len()]) / 255.0 - 0.5)
        .collect();
    normalize(&mut embedding);
    Some(embedding)
}

/// Closed-form last resort: `sin(i * 0.1 + seed * 0.001)`.
fn pattern_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let seed = f64::from(text_seed(text));
    (0..dimension)
        .map(|i| (i as f64 * 0.1 + seed * 0.001).sin() as f32)
        .collect()
}

/// Polynomial rolling hash of the text's characters.
fn text_seed(text: &str) -> i32 {
    text.chars()
        .fold(0i32, |acc, c| acc.wrapping_mul(31).wrapping_add(c as i32))
}

/// Scale to unit L2 norm; a zero vector is left untouched.
fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
