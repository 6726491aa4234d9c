//! Retrieval service: index documents, assemble query context

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use erag_core::{
    Embedder, EmbeddingError, Generator, IndexBackend, IndexOutcome, SearchResult, preview,
};

use crate::index::VectorIndex;

/// Reply when retrieval finds nothing to ground an answer on
pub const NOT_ENOUGH_INFORMATION: &str = "I don't have enough information to answer that question. Please upload relevant documents first.";

/// Reply when any step of answering a question fails
pub const ERROR_MESSAGE: &str =
    "I encountered an error while processing your question. Please try again.";

/// Separator placed between retrieved documents in a context
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Wrap retrieved context and a question into a generation prompt
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are a helpful assistant. Use the following context to answer the user's question. \
         If the answer cannot be found in the context, say so.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\n\
         Answer:",
        context, query
    )
}

/// Embeds documents into the index and turns queries into context
pub struct RetrievalService<
    E: Embedder + ?Sized = dyn Embedder,
    B: IndexBackend + ?Sized = dyn IndexBackend,
> {
    embedder: Arc<E>,
    index: Arc<VectorIndex<B>>,
    max_concurrency: usize,
}

impl<E: Embedder + ?Sized, B: IndexBackend + ?Sized> RetrievalService<E, B> {
    pub fn new(embedder: Arc<E>, index: Arc<VectorIndex<B>>) -> Self {
        Self {
            embedder,
            index,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Number of documents embedded at once by [`index_documents`](Self::index_documents)
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<VectorIndex<B>> {
        &self.index
    }

    /// Fresh document id: creation time in milliseconds plus a random suffix
    pub fn generate_document_id() -> String {
        format!(
            "doc_{}_{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }

    /// Embed `text` and store it under a fresh id.
    ///
    /// Embedding failures are returned. A failed insert is logged and reported
    /// through `indexed: false`.
    pub async fn index_document(&self, text: &str) -> Result<IndexOutcome, EmbeddingError> {
        info!("Indexing document: {}", preview(text, 50));
        let vector = self.embedder.embed(text).await?;
        let id = Self::generate_document_id();

        match self.index.insert(&id, &vector, text).await {
            Ok(()) => {
                info!("Indexed document '{}'", id);
                Ok(IndexOutcome { id, indexed: true })
            }
            Err(e) => {
                error!("Failed to index document '{}': {}", id, e);
                Ok(IndexOutcome { id, indexed: false })
            }
        }
    }

    /// Index a batch, one outcome per text in input order.
    pub async fn index_documents(
        &self,
        texts: &[String],
    ) -> Vec<Result<IndexOutcome, EmbeddingError>> {
        stream::iter(texts)
            .map(|text| self.index_document(text))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Nearest documents for `query` using the configured top-k.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, EmbeddingError> {
        let vector = self.embedder.embed(query).await?;
        Ok(self.index.search(&vector, self.index.default_top_k()).await)
    }

    /// Context for `query`: the contents of the nearest documents.
    ///
    /// Empty when the index has nothing to offer. A failed search shows up
    /// in-band as its error text.
    pub async fn answer_query(&self, query: &str) -> Result<String, EmbeddingError> {
        info!("Retrieving context for query: {}", preview(query, 50));
        let results = self.retrieve(query).await?;
        Ok(Self::build_context(&results))
    }

    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Generation prompt for `query`, or `None` when no context was found.
    pub async fn prompt_for(&self, query: &str) -> Result<Option<String>, EmbeddingError> {
        let context = self.answer_query(query).await?;
        if context.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(build_prompt(&context, query)))
    }

    /// Answer `query` with `generator`, grounded on retrieved context.
    ///
    /// Never fails: missing context and errors map to fixed replies.
    pub async fn chat(&self, query: &str, generator: &dyn Generator) -> String {
        let prompt = match self.prompt_for(query).await {
            Ok(Some(prompt)) => prompt,
            Ok(None) => return NOT_ENOUGH_INFORMATION.to_string(),
            Err(e) => {
                error!("Failed to retrieve context: {}", e);
                return ERROR_MESSAGE.to_string();
            }
        };

        match generator.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Failed to generate answer: {}", e);
                ERROR_MESSAGE.to_string()
            }
        }
    }

    pub async fn stats(&self) -> serde_json::Value {
        let documents = match self.index.count().await {
            Ok(count) => json!(count),
            Err(e) => json!(format!("unavailable: {}", e)),
        };

        json!({
            "collection": self.index.collection(),
            "dimension": self.index.dimension(),
            "documents": documents,
            "embedder_dimension": self.embedder.expected_dimension(),
            "top_k": self.index.default_top_k(),
        })
    }
}
