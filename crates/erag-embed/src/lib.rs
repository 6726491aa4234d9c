//! Embedding generation for embedrag
//!
//! This crate provides the provider strategies (managed primary, free-tier
//! remote, deterministic fallback), the fingerprint cache, and the
//! orchestrator that chains them.

mod cache;
mod config;
mod fallback;
mod orchestrator;
mod primary;
mod remote;


pub use cache::{CacheStats, EmbeddingCache, fingerprint};
pub use config::{CacheConfig, EmbeddingConfig, FreeProviderConfig, PrimaryProviderConfig};
pub use fallback::{FALLBACK_DIMENSION, FallbackEmbedder};
pub use orchestrator::EmbeddingOrchestrator;
pub use primary::PrimaryEmbedder;
pub use remote::{FreeEmbedder, RemoteEmbedder};

// Re-export core types for convenience
pub use erag_core::{
    Embedder, EmbeddingError, EmbeddingProvider, EmbeddingRequest, Error, ProviderError,
    ProviderHint, Result,
};
