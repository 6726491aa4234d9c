//! Core traits and types for embedrag
//!
//! This crate defines the data model, the error taxonomy and the seams between
//! the embedding layer, the vector index and the downstream generator.

pub mod embedder;
pub mod error;
pub mod generator;
pub mod index;
pub mod types;


pub use embedder::{Embedder, EmbeddingProvider};
pub use error::{EmbeddingError, Error, IndexError, ProviderError, Result};
pub use generator::Generator;
pub use index::IndexBackend;
pub use types::*;

/// Truncate text to at most `max_chars` characters for log output.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
