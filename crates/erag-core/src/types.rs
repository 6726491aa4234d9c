//! Shared data model

use serde::{Deserialize, Serialize};

use crate::IndexError;

/// Name of the primary-key field.
pub const ID_FIELD: &str = "id";
/// Name of the vector field.
pub const VECTOR_FIELD: &str = "embedding";
/// Name of the stored-text field.
pub const CONTENT_FIELD: &str = "content";

/// Maximum length, in characters, of a document id.
pub const ID_MAX_LEN: usize = 64;
/// Maximum length, in characters, of stored document content.
pub const CONTENT_MAX_LEN: usize = 2048;

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 5;
/// Default number of inverted-file buckets probed per search.
pub const DEFAULT_NPROBE: usize = 10;
/// Default number of inverted-file buckets built per index.
pub const DEFAULT_NLIST: usize = 128;

/// Which embedding provider a request should start from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderHint {
    /// Managed provider, falling back to the free path on failure
    Primary,
    /// Free-tier provider backed by the deterministic fallback
    Free,
}

impl ProviderHint {
    /// Parse a provider name from configuration
    pub fn from_name(s: &str) -> Option<ProviderHint> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "openai" | "managed" => Some(ProviderHint::Primary),
            "free" | "huggingface" | "hf" => Some(ProviderHint::Free),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderHint::Primary => "primary",
            ProviderHint::Free => "free",
        }
    }
}

/// A single embedding request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub text: String,
    pub provider_hint: ProviderHint,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>, provider_hint: ProviderHint) -> Self {
        Self {
            text: text.into(),
            provider_hint,
        }
    }
}

/// A document ready to be written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub vector: Vec<f32>,
    pub dimension: usize,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self {
            id: id.into(),
            content: content.into(),
            vector,
            dimension,
        }
    }

    /// Check the record against the collection limits before persistence.
    pub fn validate(&self, expected_dimension: usize) -> Result<(), IndexError> {
        if self.id.is_empty() {
            return Err(IndexError::InvalidRecord("document id is empty".to_string()));
        }
        let id_len = self.id.chars().count();
        if id_len > ID_MAX_LEN {
            return Err(IndexError::InvalidRecord(format!(
                "document id is {} characters, limit is {}",
                id_len, ID_MAX_LEN
            )));
        }
        let content_len = self.content.chars().count();
        if content_len > CONTENT_MAX_LEN {
            return Err(IndexError::InvalidRecord(format!(
                "content is {} characters, limit is {}",
                content_len, CONTENT_MAX_LEN
            )));
        }
        if self.vector.len() != self.dimension || self.dimension != expected_dimension {
            return Err(IndexError::DimensionMismatch {
                expected: expected_dimension,
                actual: self.vector.len(),
            });
        }
        Ok(())
    }
}

/// Field data types understood by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    VarChar { max_length: usize },
    FloatVector { dimension: usize },
}

/// One field of a collection schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub primary_key: bool,
}

/// Schema of a document collection: id, embedding and content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub id_field: FieldSpec,
    pub vector_field: FieldSpec,
    pub content_field: FieldSpec,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            id_field: FieldSpec {
                name: ID_FIELD.to_string(),
                field_type: FieldType::VarChar { max_length: ID_MAX_LEN },
                primary_key: true,
            },
            vector_field: FieldSpec {
                name: VECTOR_FIELD.to_string(),
                field_type: FieldType::FloatVector { dimension },
                primary_key: false,
            },
            content_field: FieldSpec {
                name: CONTENT_FIELD.to_string(),
                field_type: FieldType::VarChar { max_length: CONTENT_MAX_LEN },
                primary_key: false,
            },
        }
    }

    /// Width of the vector field.
    pub fn dimension(&self) -> usize {
        match self.vector_field.field_type {
            FieldType::FloatVector { dimension } => dimension,
            FieldType::VarChar { .. } => 0,
        }
    }
}

/// Similarity metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    Cosine,
}

/// Approximate nearest-neighbour index type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexKind {
    /// Inverted file with flat (unquantized) vectors
    IvfFlat,
}

/// Parameters for building the similarity index over the vector field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParams {
    pub field: String,
    pub kind: IndexKind,
    pub metric: Metric,
    pub nlist: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            field: VECTOR_FIELD.to_string(),
            kind: IndexKind::IvfFlat,
            metric: Metric::Cosine,
            nlist: DEFAULT_NLIST,
        }
    }
}

/// Configuration for a single vector search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub metric: Metric,
    pub nprobe: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            metric: Metric::Cosine,
            nprobe: DEFAULT_NPROBE,
        }
    }
}

/// One ranked hit from a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub content: String,
    /// Set on the synthetic result reporting a failed search
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, score: f32, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score,
            content: content.into(),
            error: false,
        }
    }

    /// The in-band result returned when a search fails.
    pub fn search_error(err: &IndexError) -> Self {
        Self {
            id: "search_error".to_string(),
            score: 0.0,
            content: format!("Vector search error: {}", err),
            error: true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error
    }
}

/// Outcome of indexing one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOutcome {
    pub id: String,
    pub indexed: bool,
}
