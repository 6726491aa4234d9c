//! Text generation seam

use async_trait::async_trait;

use crate::Result;

/// Trait for the downstream text-generation call
///
/// Generation is an external collaborator; retrieval only hands it a prompt
/// that already carries the retrieved context.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for a fully built prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}
