//! Provider selection and fallback chain

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use erag_core::{
    Embedder, EmbeddingError, EmbeddingProvider, EmbeddingRequest, ProviderHint, Result,
};

use crate::cache::EmbeddingCache;
use crate::config::EmbeddingConfig;
use crate::primary::PrimaryEmbedder;
use crate::remote::FreeEmbedder;

/// One link of the fallback chain
struct Strategy {
    tier: ProviderHint,
    provider: Arc<dyn EmbeddingProvider>,
}

/// Embedding entry point: tries strategies in order, first success wins
pub struct EmbeddingOrchestrator {
    chain: Vec<Strategy>,
    default_hint: ProviderHint,
    expected_dimension: usize,
    cache: Arc<EmbeddingCache>,
}

impl EmbeddingOrchestrator {
    /// Build the chain described by `config`.
    ///
    /// `primary` yields `[primary, free]`, `free` yields `[free]`. The cache is
    /// created here and shared with the free provider.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let cache = Arc::new(EmbeddingCache::new(&config.cache));
        let free: Arc<dyn EmbeddingProvider> = Arc::new(FreeEmbedder::from_config(
            &config.free,
            config.connect_timeout(),
            cache.clone(),
        )?);

        let mut orchestrator = Self::with_cache(config.dimension, config.provider, cache);
        if config.provider == ProviderHint::Primary {
            let primary = PrimaryEmbedder::new(config.primary.clone(), config.connect_timeout())?;
            orchestrator = orchestrator.with_provider(ProviderHint::Primary, Arc::new(primary));
        }
        Ok(orchestrator.with_provider(ProviderHint::Free, free))
    }

    /// Empty chain; add strategies with [`with_provider`](Self::with_provider).
    pub fn with_cache(
        expected_dimension: usize,
        default_hint: ProviderHint,
        cache: Arc<EmbeddingCache>,
    ) -> Self {
        Self {
            chain: Vec::new(),
            default_hint,
            expected_dimension,
            cache,
        }
    }

    /// Append a strategy to the end of the chain.
    pub fn with_provider(mut self, tier: ProviderHint, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.chain.push(Strategy { tier, provider });
        self
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|s| s.provider.name()).collect()
    }

    /// Embed a request, starting at the tier named by its hint.
    ///
    /// A `Free` hint skips primary strategies entirely.
    pub async fn embed_request(
        &self,
        request: &EmbeddingRequest,
    ) -> std::result::Result<Vec<f32>, EmbeddingError> {
        if request.text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut attempts = Vec::new();
        let candidates = self.chain.iter().filter(|s| {
            request.provider_hint == ProviderHint::Primary || s.tier == ProviderHint::Free
        });

        for strategy in candidates {
            let name = strategy.provider.name();
            info!("Generating embeddings using provider: {}", name);

            match strategy.provider.embed(&request.text).await {
                Ok(vector) => {
                    self.validate_dimension(name, &vector);
                    return Ok(vector);
                }
                Err(e) => {
                    error!("Failed to generate embeddings with {}: {}", name, e);
                    warn!("Falling back to next embedding provider");
                    attempts.push(format!("{}: {}", name, e));
                }
            }
        }

        if attempts.is_empty() {
            attempts.push(format!(
                "no provider configured for {} requests",
                request.provider_hint.name()
            ));
        }
        Err(EmbeddingError::AllProvidersFailed { attempts })
    }

    /// A width mismatch is reported but never fatal.
    fn validate_dimension(&self, provider: &str, vector: &[f32]) -> bool {
        if vector.len() != self.expected_dimension {
            warn!(
                "Expected {} dimensions but {} returned {}. Consider updating RAG_EMBEDDING_DIMENSION.",
                self.expected_dimension,
                provider,
                vector.len()
            );
            return false;
        }
        true
    }
}

#[async_trait]
impl Embedder for EmbeddingOrchestrator {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        self.embed_request(&EmbeddingRequest::new(text, self.default_hint))
            .await
    }

    fn expected_dimension(&self) -> usize {
        self.expected_dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackEmbedder;
    use erag_core::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub with a fixed answer and a call counter
    struct StubProvider {
        name: &'static str,
        answer: std::result::Result<Vec<f32>, ProviderError>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn ok(name: &'static str, vector: Vec<f32>) -> Arc<Self> {
            Arc::new(Self { name, answer: Ok(vector), calls: AtomicUsize::new(0) })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer: Err(ProviderError::Network("connection refused".to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn orchestrator(hint: ProviderHint, dimension: usize) -> EmbeddingOrchestrator {
        EmbeddingOrchestrator::with_cache(dimension, hint, Arc::new(EmbeddingCache::unbounded()))
    }

    #[tokio::test]
    async fn test_primary_success_short_circuits() {
        let primary = StubProvider::ok("primary", vec![1.0, 0.0]);
        let free = StubProvider::ok("free", vec![0.0, 1.0]);
        let orchestrator = orchestrator(ProviderHint::Primary, 2)
            .with_provider(ProviderHint::Primary, primary.clone())
            .with_provider(ProviderHint::Free, free.clone());

        assert_eq!(orchestrator.embed("sky").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(free.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_primary_falls_back_to_deterministic_embedding() {
        let primary = StubProvider::failing("primary");
        let orchestrator = orchestrator(ProviderHint::Primary, 384)
            .with_provider(ProviderHint::Primary, primary.clone())
            .with_provider(ProviderHint::Free, Arc::new(FreeEmbedder::offline()));

        for text in ["The sky is blue.", "What color is the sky?"] {
            let vector = orchestrator.embed(text).await.unwrap();
            assert_eq!(vector, FallbackEmbedder::new().embed_deterministic(text));
        }
        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn test_both_providers_failing_is_an_error() {
        let orchestrator = orchestrator(ProviderHint::Primary, 2)
            .with_provider(ProviderHint::Primary, StubProvider::failing("primary"))
            .with_provider(ProviderHint::Free, StubProvider::failing("free"));

        match orchestrator.embed("sky").await {
            Err(EmbeddingError::AllProvidersFailed { attempts }) => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("primary:"));
                assert!(attempts[1].starts_with("free:"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_free_hint_skips_primary() {
        let primary = StubProvider::ok("primary", vec![1.0]);
        let free = StubProvider::ok("free", vec![2.0]);
        let orchestrator = orchestrator(ProviderHint::Free, 1)
            .with_provider(ProviderHint::Primary, primary.clone())
            .with_provider(ProviderHint::Free, free.clone());

        assert_eq!(orchestrator.embed("sky").await.unwrap(), vec![2.0]);
        assert_eq!(primary.calls(), 0);

        let explicit = EmbeddingRequest::new("sky", ProviderHint::Primary);
        assert_eq!(orchestrator.embed_request(&explicit).await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_not_fatal() {
        let orchestrator = orchestrator(ProviderHint::Free, 1536)
            .with_provider(ProviderHint::Free, Arc::new(FreeEmbedder::offline()));

        let vector = orchestrator.embed("narrow").await.unwrap();
        assert_eq!(vector.len(), 384);
        assert!(!orchestrator.validate_dimension("free", &vector));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let free = StubProvider::ok("free", vec![1.0]);
        let orchestrator = orchestrator(ProviderHint::Free, 1)
            .with_provider(ProviderHint::Free, free.clone());

        assert_eq!(orchestrator.embed("   ").await, Err(EmbeddingError::EmptyInput));
        assert_eq!(free.calls(), 0);
    }

    #[test]
    fn test_chain_from_config() {
        let config = EmbeddingConfig::default();
        let orchestrator = EmbeddingOrchestrator::from_config(&config).unwrap();
        assert_eq!(orchestrator.provider_names(), vec!["primary", "free"]);

        let orchestrator = EmbeddingOrchestrator::from_config(&EmbeddingConfig::offline()).unwrap();
        assert_eq!(orchestrator.provider_names(), vec!["free"]);
        assert_eq!(orchestrator.expected_dimension(), 384);
    }
}
