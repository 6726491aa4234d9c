//! Vector index lifecycle over an index engine

use std::sync::Arc;
use tracing::{error, info, warn};

use erag_core::{
    CollectionSchema, Document, IndexBackend, IndexError, IndexParams, SearchConfig, SearchResult,
};

use crate::config::{BackendKind, IndexConfig};
use crate::memory::MemoryBackend;
use crate::qdrant::QdrantBackend;

/// A collection in an index engine plus the rules for using it
///
/// Schema creation is idempotent, writes are validated against the schema,
/// and searches never fail: an engine error comes back as a single synthetic
/// result.
pub struct VectorIndex<B: IndexBackend + ?Sized = dyn IndexBackend> {
    backend: Arc<B>,
    collection: String,
    dimension: usize,
    index_params: IndexParams,
    search_config: SearchConfig,
}

impl<B: IndexBackend + ?Sized> VectorIndex<B> {
    pub fn new(backend: Arc<B>, collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            backend,
            collection: collection.into(),
            dimension,
            index_params: IndexParams::default(),
            search_config: SearchConfig::default(),
        }
    }

    pub fn from_config(backend: Arc<B>, config: &IndexConfig) -> Self {
        let mut index = Self::new(backend, config.collection_name(), config.dimension);
        index.search_config.top_k = config.top_k;
        index.search_config.nprobe = config.nprobe;
        index
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn default_top_k(&self) -> usize {
        self.search_config.top_k
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Create the configured collection if needed. Call once at startup.
    pub async fn initialize(&self) -> Result<bool, IndexError> {
        self.ensure_schema(&self.collection, self.dimension).await
    }

    /// Create collection `name` and its similarity index unless they exist.
    ///
    /// Returns whether the collection was created. Existence check and
    /// creation are not atomic; if creation fails because another initializer
    /// got there first, the collection is accepted as is. A collection whose
    /// index build failed earlier gets the index on the next call.
    pub async fn ensure_schema(&self, name: &str, dimension: usize) -> Result<bool, IndexError> {
        let created = if self.backend.has_collection(name).await? {
            info!("Collection '{}' already exists", name);
            false
        } else {
            self.create_collection(name, dimension).await?
        };

        if !self.backend.has_index(name).await? {
            self.backend.create_index(name, &self.index_params).await?;
            info!(
                "Created {:?} index with {:?} metric on collection '{}'.",
                self.index_params.kind, self.index_params.metric, name
            );
        }
        Ok(created)
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<bool, IndexError> {
        let schema = CollectionSchema::new(name, dimension);
        match self.backend.create_collection(&schema).await {
            Ok(()) => {
                info!("Created collection '{}'", name);
                Ok(true)
            }
            Err(e) if self.backend.has_collection(name).await.unwrap_or(false) => {
                warn!("Collection '{}' was created concurrently: {}", name, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Append one record.
    pub async fn insert(&self, id: &str, vector: &[f32], content: &str) -> Result<(), IndexError> {
        let document = Document::new(id, content, vector.to_vec());
        document.validate(self.dimension)?;

        self.backend.insert(&self.collection, &document).await?;
        info!("Inserted embedding for document '{}'", id);
        Ok(())
    }

    /// Up to `top_k` nearest records, most similar first.
    pub async fn search(&self, vector: &[f32], top_k: usize) -> Vec<SearchResult> {
        let config = SearchConfig {
            top_k,
            ..self.search_config.clone()
        };

        match self.backend.search(&self.collection, vector, &config).await {
            Ok(results) => {
                info!("Found {} similar embeddings.", results.len());
                results
            }
            Err(e) => {
                error!("Search failed: {}", e);
                vec![SearchResult::search_error(&e)]
            }
        }
    }

    pub async fn count(&self) -> Result<usize, IndexError> {
        self.backend.count(&self.collection).await
    }
}

impl VectorIndex {
    /// Connect to the engine named in `config`.
    pub fn open(config: &IndexConfig) -> Result<Self, IndexError> {
        let backend: Arc<dyn IndexBackend> = match config.backend {
            BackendKind::Qdrant => Arc::new(QdrantBackend::from_config(config)?),
            BackendKind::Memory => {
                info!("Using in-memory index");
                Arc::new(MemoryBackend::new())
            }
        };
        Ok(Self::from_config(backend, config))
    }
}
