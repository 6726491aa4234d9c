//! Free-tier feature-extraction provider
//!
//! `RemoteEmbedder` performs a single cached request against a
//! feature-extraction endpoint. `FreeEmbedder` puts the deterministic
//! fallback underneath it so the free path always yields a vector.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use erag_core::{EmbeddingProvider, Error, ProviderError, Result, preview};

use crate::cache::{EmbeddingCache, fingerprint};
use crate::config::FreeProviderConfig;
use crate::fallback::FallbackEmbedder;

const USER_AGENT: &str = concat!("embedrag/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
    options: RequestOptions,
}

/// Feature-extraction responses: one vector per input, or a bare vector
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Batch(Vec<Vec<f32>>),
    Single(Vec<f32>),
}

impl FeatureExtractionResponse {
    fn into_vector(self) -> std::result::Result<Vec<f32>, ProviderError> {
        let vector = match self {
            FeatureExtractionResponse::Batch(batch) => batch.into_iter().next().ok_or_else(|| {
                ProviderError::MalformedResponse("response array is empty".to_string())
            })?,
            FeatureExtractionResponse::Single(vector) => vector,
        };
        if vector.is_empty() {
            return Err(ProviderError::MalformedResponse("embedding is empty".to_string()));
        }
        Ok(vector)
    }
}

/// Cached client for the free feature-extraction API
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    cache: Arc<EmbeddingCache>,
}

impl RemoteEmbedder {
    pub fn new(
        config: &FreeProviderConfig,
        connect_timeout: Duration,
        cache: Arc<EmbeddingCache>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_token: config.api_token.clone(),
            cache,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Embed `text`, consulting the cache before any request is sent.
    pub async fn fetch(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let key = fingerprint(text);
        if let Some(vector) = self.cache.get(&key).await {
            debug!("Using cached embedding for text: {}", preview(text, 50));
            return Ok(vector);
        }

        info!("Generating free embedding for text: {}", preview(text, 50));
        let vector = self.request(text).await?;
        self.cache.insert(key, vector.clone()).await;

        info!("Generated embedding with {} dimensions", vector.len());
        Ok(vector)
    }

    async fn request(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let body = FeatureExtractionRequest {
            inputs: text,
            options: RequestOptions { wait_for_model: true },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let parsed: FeatureExtractionResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
                parsed.into_vector()
            }
            StatusCode::SERVICE_UNAVAILABLE => Err(ProviderError::ModelLoading),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

/// Free provider strategy: remote call with the deterministic floor beneath it
pub struct FreeEmbedder {
    remote: Option<RemoteEmbedder>,
    fallback: FallbackEmbedder,
}

impl FreeEmbedder {
    pub fn new(remote: RemoteEmbedder) -> Self {
        Self {
            remote: Some(remote),
            fallback: FallbackEmbedder::new(),
        }
    }

    /// Free strategy that never touches the network.
    pub fn offline() -> Self {
        Self {
            remote: None,
            fallback: FallbackEmbedder::new(),
        }
    }

    pub fn from_config(
        config: &FreeProviderConfig,
        connect_timeout: Duration,
        cache: Arc<EmbeddingCache>,
    ) -> Result<Self> {
        if config.offline {
            return Ok(Self::offline());
        }
        Ok(Self::new(RemoteEmbedder::new(config, connect_timeout, cache)?))
    }

    pub fn remote(&self) -> Option<&RemoteEmbedder> {
        self.remote.as_ref()
    }
}

#[async_trait]
impl EmbeddingProvider for FreeEmbedder {
    fn name(&self) -> &'static str {
        "free"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let Some(remote) = &self.remote else {
            return Ok(self.fallback.embed_deterministic(text));
        };

        match remote.fetch(text).await {
            Ok(vector) => Ok(vector),
            Err(ProviderError::ModelLoading) => {
                warn!("Free embedding model is loading, using fallback embedding");
                Ok(self.fallback.embed_deterministic(text))
            }
            Err(e) => {
                warn!("Free embedding request failed: {}, using fallback embedding", e);
                Ok(self.fallback.embed_deterministic(text))
            }
        }
    }
}
