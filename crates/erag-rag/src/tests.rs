//! End-to-end and snapshot tests for retrieval

#[cfg(test)]
mod snapshot_tests {
    use crate::{
        Embedder, EmbeddingError, Error, Generator, IndexBackend, IndexError, MemoryBackend,
        NOT_ENOUGH_INFORMATION, ERROR_MESSAGE, RetrievalService, VectorIndex,
    };
    use async_trait::async_trait;
    use erag_core::{CollectionSchema, Document, IndexParams, SearchConfig, SearchResult};
    use erag_embed::{EmbeddingConfig, EmbeddingOrchestrator};
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn offline_service() -> RetrievalService<EmbeddingOrchestrator, MemoryBackend> {
        let embedder = EmbeddingOrchestrator::from_config(&EmbeddingConfig::offline()).unwrap();
        let index = VectorIndex::new(Arc::new(MemoryBackend::new()), "documents", 384);
        index.initialize().await.unwrap();
        RetrievalService::new(Arc::new(embedder), Arc::new(index))
    }

    /// Memory backend that counts schema creation, can report a stale
    /// "missing" on its first existence checks and can fail index builds
    struct SpyBackend {
        inner: MemoryBackend,
        creates: AtomicUsize,
        index_builds: AtomicUsize,
        stale_checks: AtomicUsize,
        index_failures: AtomicUsize,
    }

    impl SpyBackend {
        fn new() -> Self {
            Self {
                inner: MemoryBackend::new(),
                creates: AtomicUsize::new(0),
                index_builds: AtomicUsize::new(0),
                stale_checks: AtomicUsize::new(0),
                index_failures: AtomicUsize::new(0),
            }
        }

        fn creates(&self) -> usize {
            self.creates.load(Ordering::SeqCst)
        }

        fn index_builds(&self) -> usize {
            self.index_builds.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IndexBackend for SpyBackend {
        async fn has_collection(&self, name: &str) -> Result<bool, IndexError> {
            if self.stale_checks.load(Ordering::SeqCst) > 0 {
                self.stale_checks.fetch_sub(1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.has_collection(name).await
        }

        async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_collection(schema).await
        }

        async fn has_index(&self, collection: &str) -> Result<bool, IndexError> {
            self.inner.has_index(collection).await
        }

        async fn create_index(&self, collection: &str, params: &IndexParams) -> Result<(), IndexError> {
            self.index_builds.fetch_add(1, Ordering::SeqCst);
            if self.index_failures.load(Ordering::SeqCst) > 0 {
                self.index_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(IndexError::Schema("index build interrupted".to_string()));
            }
            self.inner.create_index(collection, params).await
        }

        async fn insert(&self, collection: &str, document: &Document) -> Result<(), IndexError> {
            self.inner.insert(collection, document).await
        }

        async fn search(
            &self,
            collection: &str,
            vector: &[f32],
            config: &SearchConfig,
        ) -> Result<Vec<SearchResult>, IndexError> {
            self.inner.search(collection, vector, config).await
        }

        async fn count(&self, collection: &str) -> Result<usize, IndexError> {
            self.inner.count(collection).await
        }
    }

    /// Embedder that always returns the same vector, or always fails
    struct FixedEmbedder(Option<Vec<f32>>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.0.clone().ok_or(EmbeddingError::AllProvidersFailed {
                attempts: vec!["free: network error: connection refused".to_string()],
            })
        }

        fn expected_dimension(&self) -> usize {
            self.0.as_ref().map_or(384, Vec::len)
        }
    }

    struct StubGenerator(Option<&'static str>);

    #[async_trait]
    impl Generator for StubGenerator {
        async fn generate(&self, prompt: &str) -> erag_core::Result<String> {
            assert!(prompt.contains("Question:"));
            self.0
                .map(str::to_string)
                .ok_or_else(|| Error::Generation("model unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sky_is_blue_end_to_end() {
        let service = offline_service().await;

        let outcome = service.index_document("The sky is blue.").await.unwrap();
        assert!(outcome.indexed);
        assert!(outcome.id.starts_with("doc_"));

        let context = service.answer_query("What color is the sky?").await.unwrap();
        assert!(context.contains("The sky is blue."));
    }

    #[tokio::test]
    async fn test_query_before_indexing_has_no_context() {
        let service = offline_service().await;

        assert_eq!(service.answer_query("What color is the sky?").await.unwrap(), "");
        assert_eq!(service.prompt_for("What color is the sky?").await.unwrap(), None);

        let reply = service.chat("What color is the sky?", &StubGenerator(Some("blue"))).await;
        assert_eq!(reply, NOT_ENOUGH_INFORMATION);
    }

    #[tokio::test]
    async fn test_chat_uses_generator_answer() {
        let service = offline_service().await;
        service.index_document("The sky is blue.").await.unwrap();

        let reply = service.chat("What color is the sky?", &StubGenerator(Some("Blue."))).await;
        assert_eq!(reply, "Blue.");

        let reply = service.chat("What color is the sky?", &StubGenerator(None)).await;
        assert_eq!(reply, ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_batch_indexing_keeps_order() {
        let service = offline_service().await.with_max_concurrency(2);
        let texts: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();

        let outcomes = service.index_documents(&texts).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.as_ref().is_ok_and(|o| o.indexed)));
        assert_eq!(service.index().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ensure_schema_creates_once() {
        let backend = Arc::new(SpyBackend::new());
        let index = VectorIndex::new(backend.clone(), "documents", 384);

        assert!(index.ensure_schema("documents", 384).await.unwrap());
        assert!(!index.ensure_schema("documents", 384).await.unwrap());
        assert_eq!(backend.creates(), 1);
        assert_eq!(backend.index_builds(), 1);
    }

    #[tokio::test]
    async fn test_failed_index_build_is_retried() {
        let backend = Arc::new(SpyBackend::new());
        backend.index_failures.store(1, Ordering::SeqCst);
        let index = VectorIndex::new(backend.clone(), "documents", 384);

        assert_eq!(
            index.initialize().await,
            Err(IndexError::Schema("index build interrupted".to_string()))
        );
        assert_eq!(backend.inner.index_params("documents"), None);

        // Collection already exists; only the index is built
        assert!(!index.initialize().await.unwrap());
        assert_eq!(backend.creates(), 1);
        assert_eq!(backend.index_builds(), 2);
        assert_eq!(
            backend.inner.index_params("documents"),
            Some(IndexParams::default())
        );

        assert!(!index.initialize().await.unwrap());
        assert_eq!(backend.index_builds(), 2);
    }

    #[tokio::test]
    async fn test_ensure_schema_survives_lost_race() {
        let backend = Arc::new(SpyBackend::new());
        backend
            .inner
            .create_collection(&CollectionSchema::new("documents", 384))
            .await
            .unwrap();
        backend.stale_checks.store(1, Ordering::SeqCst);

        let index = VectorIndex::new(backend.clone(), "documents", 384);
        assert!(!index.ensure_schema("documents", 384).await.unwrap());
        assert_eq!(backend.creates(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_is_absorbed() {
        let index = VectorIndex::new(Arc::new(MemoryBackend::new()), "documents", 384);
        index.initialize().await.unwrap();
        let service = RetrievalService::new(
            Arc::new(FixedEmbedder(Some(vec![1.0, 0.0, 0.0]))),
            Arc::new(index),
        );

        let outcome = service.index_document("too narrow").await.unwrap();
        assert!(!outcome.indexed);
        assert_eq!(service.index().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let index = VectorIndex::new(Arc::new(MemoryBackend::new()), "documents", 384);
        let service = RetrievalService::new(Arc::new(FixedEmbedder(None)), Arc::new(index));

        assert!(matches!(
            service.index_document("The sky is blue.").await,
            Err(EmbeddingError::AllProvidersFailed { .. })
        ));
        assert!(service.answer_query("What color is the sky?").await.is_err());

        let reply = service.chat("What color is the sky?", &StubGenerator(Some("blue"))).await;
        assert_eq!(reply, ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_search_error_reaches_context() {
        // Collection never initialized
        let index = VectorIndex::new(Arc::new(MemoryBackend::new()), "documents", 384);
        let service = RetrievalService::new(
            Arc::new(EmbeddingOrchestrator::from_config(&EmbeddingConfig::offline()).unwrap()),
            Arc::new(index),
        );

        let context = service.answer_query("What color is the sky?").await.unwrap();
        assert!(context.starts_with("Vector search error:"));
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let service = offline_service().await;
        service.index_document("The sky is blue.").await.unwrap();

        assert_yaml_snapshot!(service.stats().await, @r###"
        ---
        collection: documents
        dimension: 384
        documents: 1
        embedder_dimension: 384
        top_k: 5
        "###);
    }

    #[test]
    fn test_prompt_snapshot() {
        let prompt = crate::build_prompt("The sky is blue.", "What color is the sky?");

        assert_snapshot!(prompt, @r###"
        You are a helpful assistant. Use the following context to answer the user's question. If the answer cannot be found in the context, say so.

        Context:
        The sky is blue.

        Question: What color is the sky?

        Answer:
        "###);
    }
}
