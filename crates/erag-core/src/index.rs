//! Vector index engine trait

use async_trait::async_trait;

use crate::{CollectionSchema, Document, IndexError, IndexParams, SearchConfig, SearchResult};

/// Trait for vector index engines (e.g., Qdrant, in-memory)
///
/// These are the engine's primitive operations. Lifecycle rules such as
/// idempotent schema creation and fail-soft search live one level up, in the
/// `VectorIndex` that drives a backend.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Check whether a collection exists
    async fn has_collection(&self, name: &str) -> Result<bool, IndexError>;

    /// Create a collection with the given schema
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError>;

    /// Check whether the similarity index of a collection has been built
    async fn has_index(&self, collection: &str) -> Result<bool, IndexError>;

    /// Build the similarity index over a collection's vector field
    async fn create_index(&self, collection: &str, params: &IndexParams) -> Result<(), IndexError>;

    /// Append one document
    async fn insert(&self, collection: &str, document: &Document) -> Result<(), IndexError>;

    /// Ranked nearest neighbours of `vector`, best first
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>, IndexError>;

    /// Number of stored documents
    async fn count(&self, collection: &str) -> Result<usize, IndexError>;
}
