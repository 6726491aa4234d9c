//! Embedding configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use erag_core::{Error, ProviderHint, Result};

use crate::fallback::FALLBACK_DIMENSION;

/// Settings for the managed (primary) embedding provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryProviderConfig {
    pub api_base: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for PrimaryProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
        }
    }
}

/// Settings for the free-tier provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeProviderConfig {
    pub api_base: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Skip the network entirely and use the deterministic embedder
    pub offline: bool,
}

impl Default for FreeProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api-inference.huggingface.co/pipeline/feature-extraction".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            api_token: None,
            offline: false,
        }
    }
}

impl FreeProviderConfig {
    /// Full request URL: `<api-base>/<model-name>`
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), self.model)
    }
}

/// Optional bounds for the embedding cache; unbounded when both are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: Option<u64>,
    pub ttl_secs: Option<u64>,
}

/// Configuration for the embedding pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: ProviderHint,
    pub dimension: usize,
    pub connect_timeout_secs: u64,
    pub primary: PrimaryProviderConfig,
    pub free: FreeProviderConfig,
    pub cache: CacheConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderHint::Primary,
            dimension: 1536,
            connect_timeout_secs: 30,
            primary: PrimaryProviderConfig::default(),
            free: FreeProviderConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let provider = match lookup("RAG_EMBEDDING_PROVIDER") {
            Some(name) => ProviderHint::from_name(&name).ok_or_else(|| {
                Error::Configuration(format!(
                    "RAG_EMBEDDING_PROVIDER must be 'primary' or 'free', got '{}'",
                    name
                ))
            })?,
            None => defaults.provider,
        };

        let primary = PrimaryProviderConfig {
            api_base: lookup("RAG_PRIMARY_API_BASE").unwrap_or(defaults.primary.api_base),
            model: lookup("RAG_PRIMARY_MODEL").unwrap_or(defaults.primary.model),
            api_key: lookup("RAG_PRIMARY_API_KEY").or_else(|| lookup("OPENAI_API_KEY")),
        };

        let free = FreeProviderConfig {
            api_base: lookup("RAG_FREE_API_BASE").unwrap_or(defaults.free.api_base),
            model: lookup("RAG_FREE_MODEL").unwrap_or(defaults.free.model),
            api_token: lookup("RAG_FREE_API_TOKEN"),
            offline: parse_var(&lookup, "RAG_FREE_OFFLINE")?.unwrap_or(false),
        };

        let cache = CacheConfig {
            max_entries: parse_var(&lookup, "RAG_CACHE_MAX_ENTRIES")?,
            ttl_secs: parse_var(&lookup, "RAG_CACHE_TTL_SECS")?,
        };

        let config = Self {
            provider,
            dimension: parse_var(&lookup, "RAG_EMBEDDING_DIMENSION")?.unwrap_or(defaults.dimension),
            connect_timeout_secs: parse_var(&lookup, "RAG_CONNECT_TIMEOUT_SECS")?
                .unwrap_or(defaults.connect_timeout_secs),
            primary,
            free,
            cache,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration that never leaves the process: free path, offline, 384 wide
    pub fn offline() -> Self {
        Self {
            provider: ProviderHint::Free,
            dimension: FALLBACK_DIMENSION,
            free: FreeProviderConfig {
                offline: true,
                ..FreeProviderConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::Configuration(
                "RAG_EMBEDDING_DIMENSION must be greater than zero".to_string(),
            ));
        }
        if self.provider == ProviderHint::Primary {
            Url::parse(&self.primary.api_base).map_err(|e| {
                Error::Configuration(format!("invalid RAG_PRIMARY_API_BASE: {}", e))
            })?;
        }
        if !self.free.offline {
            Url::parse(&self.free.endpoint()).map_err(|e| {
                Error::Configuration(format!("invalid RAG_FREE_API_BASE: {}", e))
            })?;
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Configuration(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}
