//! Embedding traits

use async_trait::async_trait;

use crate::{EmbeddingError, ProviderError};

/// Trait for a single embedding provider strategy
///
/// A provider turns one text into one vector. Failures are reported as
/// `ProviderError` so that the caller can move on to the next strategy.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short name used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Trait for the embedding entry point used by retrieval
///
/// Implementations hide provider selection and fallback; a call either yields
/// a usable vector or an `EmbeddingError` once every path is exhausted.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Width the embedder is configured to produce
    fn expected_dimension(&self) -> usize;
}
