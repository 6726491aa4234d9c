//! Vector index and retrieval service for embedrag
//!
//! This crate provides the index engines (Qdrant, in-memory), the `VectorIndex`
//! lifecycle around them, and the `RetrievalService` that ties embeddings to
//! stored documents.

mod config;
mod index;
mod memory;
mod qdrant;
mod service;

#[cfg(test)]
mod tests;

pub use config::{BackendKind, IndexConfig};
pub use index::VectorIndex;
pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;
pub use service::{
    CONTEXT_SEPARATOR, ERROR_MESSAGE, NOT_ENOUGH_INFORMATION, RetrievalService, build_prompt,
};

// Re-export core types for convenience
pub use erag_core::{
    Document, Embedder, EmbeddingError, Error, Generator, IndexBackend, IndexError, IndexOutcome,
    Result, SearchResult,
};
