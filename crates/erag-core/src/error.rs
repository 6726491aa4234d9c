//! Error types for embedrag

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single embedding provider call.
///
/// Always recovered inside the embedding layer, either by switching to the
/// next provider in the chain or by the deterministic fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider model is still loading")]
    ModelLoading,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

/// Failure to produce an embedding at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("all embedding providers failed: {}", .attempts.join("; "))]
    AllProvidersFailed { attempts: Vec<String> },
}

/// Vector index failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("index connection error: {0}")]
    Connection(String),

    #[error("schema creation failed: {0}")]
    Schema(String),

    #[error("index write failed: {0}")]
    Write(String),

    #[error("index search failed: {0}")]
    Search(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("vector has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Core error types for the embedrag system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
