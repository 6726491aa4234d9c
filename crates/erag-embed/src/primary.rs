//! Managed embedding provider (OpenAI-compatible `/embeddings` API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use erag_core::{EmbeddingProvider, Error, ProviderError, Result};

use crate::config::PrimaryProviderConfig;

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Client for the primary embedding provider
pub struct PrimaryEmbedder {
    config: PrimaryProviderConfig,
    client: Client,
}

impl PrimaryEmbedder {
    pub fn new(config: PrimaryProviderConfig, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a list of texts, return one vector per input in input order
    async fn call_embeddings_api(
        &self,
        texts: Vec<&str>,
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::Configuration(
                "primary API key not set. Set RAG_PRIMARY_API_KEY or OPENAI_API_KEY".to_string(),
            )
        })?;

        let url = format!("{}/embeddings", self.config.api_base.trim_end_matches('/'));
        let request = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for PrimaryEmbedder {
    fn name(&self) -> &'static str {
        "primary"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let vector = self
            .call_embeddings_api(vec![text])
            .await?
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding in response".to_string()))?;

        info!("Generated {} embedding with {} dimensions", self.config.model, vector.len());
        Ok(vector)
    }
}
