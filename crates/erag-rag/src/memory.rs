//! In-process index engine
//!
//! Brute-force cosine search over a map of documents. Used for tests, demos
//! and offline runs where no vector database is available.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use erag_core::{
    CollectionSchema, Document, IndexBackend, IndexError, IndexParams, SearchConfig, SearchResult,
};

struct MemoryCollection {
    schema: CollectionSchema,
    index: Option<IndexParams>,
    documents: HashMap<String, Document>,
}

/// Local in-memory index engine
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Parameters of the similarity index built on a collection, if any
    pub fn index_params(&self, collection: &str) -> Option<IndexParams> {
        self.collections
            .read()
            .ok()?
            .get(collection)
            .and_then(|c| c.index.clone())
    }

    /// Simple cosine similarity calculation
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexBackend for MemoryBackend {
    async fn has_collection(&self, name: &str) -> Result<bool, IndexError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IndexError::Connection(format!("Lock error: {}", e)))?;
        Ok(collections.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IndexError::Schema(format!("Lock error: {}", e)))?;

        if collections.contains_key(&schema.name) {
            return Err(IndexError::Schema(format!(
                "collection '{}' already exists",
                schema.name
            )));
        }

        collections.insert(
            schema.name.clone(),
            MemoryCollection {
                schema: schema.clone(),
                index: None,
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn has_index(&self, collection: &str) -> Result<bool, IndexError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IndexError::Connection(format!("Lock error: {}", e)))?;
        Ok(collections.get(collection).is_some_and(|c| c.index.is_some()))
    }

    async fn create_index(&self, collection: &str, params: &IndexParams) -> Result<(), IndexError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IndexError::Schema(format!("Lock error: {}", e)))?;

        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| IndexError::Schema(format!("collection '{}' not found", collection)))?;
        entry.index = Some(params.clone());
        Ok(())
    }

    async fn insert(&self, collection: &str, document: &Document) -> Result<(), IndexError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IndexError::Write(format!("Lock error: {}", e)))?;

        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| IndexError::Write(format!("collection '{}' not found", collection)))?;

        let expected = entry.schema.dimension();
        if document.vector.len() != expected {
            return Err(IndexError::Write(format!(
                "vector has {} dimensions, field '{}' expects {}",
                document.vector.len(),
                entry.schema.vector_field.name,
                expected
            )));
        }

        entry.documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IndexError::Search(format!("Lock error: {}", e)))?;

        let entry = collections
            .get(collection)
            .ok_or_else(|| IndexError::Search(format!("collection '{}' not found", collection)))?;

        let expected = entry.schema.dimension();
        if vector.len() != expected {
            return Err(IndexError::Search(format!(
                "query vector has {} dimensions, collection expects {}",
                vector.len(),
                expected
            )));
        }

        let mut results: Vec<SearchResult> = entry
            .documents
            .values()
            .map(|doc| {
                SearchResult::new(
                    doc.id.clone(),
                    Self::cosine_similarity(vector, &doc.vector),
                    doc.content.clone(),
                )
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(config.top_k);

        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize, IndexError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IndexError::Connection(format!("Lock error: {}", e)))?;
        Ok(collections.get(collection).map_or(0, |c| c.documents.len()))
    }
}
