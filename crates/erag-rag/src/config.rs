//! Vector index configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use erag_core::{DEFAULT_NPROBE, DEFAULT_TOP_K, Error, Result};

/// Which index engine to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Qdrant,
    Memory,
}

impl BackendKind {
    pub fn from_name(s: &str) -> Option<BackendKind> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Some(BackendKind::Qdrant),
            "memory" | "in-memory" => Some(BackendKind::Memory),
            _ => None,
        }
    }
}

/// Configuration for the vector index connection and searches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    pub dimension: usize,
    pub top_k: usize,
    pub nprobe: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Qdrant,
            host: "localhost".to_string(),
            port: 6334,
            database: "default".to_string(),
            collection: "documents".to_string(),
            dimension: 1536,
            top_k: DEFAULT_TOP_K,
            nprobe: DEFAULT_NPROBE,
        }
    }
}

impl IndexConfig {
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

        let backend = match lookup("RAG_INDEX_BACKEND") {
            Some(name) => BackendKind::from_name(&name).ok_or_else(|| {
                Error::Configuration(format!(
                    "RAG_INDEX_BACKEND must be 'qdrant' or 'memory', got '{}'",
                    name
                ))
            })?,
            None => defaults.backend,
        };

        let config = Self {
            backend,
            host: lookup("RAG_INDEX_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "RAG_INDEX_PORT")?.unwrap_or(defaults.port),
            database: lookup("RAG_INDEX_DATABASE").unwrap_or(defaults.database),
            collection: lookup("RAG_INDEX_COLLECTION").unwrap_or(defaults.collection),
            dimension: parse_var(&lookup, "RAG_INDEX_DIMENSION")?.unwrap_or(defaults.dimension),
            top_k: parse_var(&lookup, "RAG_SEARCH_TOP_K")?.unwrap_or(defaults.top_k),
            nprobe: parse_var(&lookup, "RAG_SEARCH_NPROBE")?.unwrap_or(defaults.nprobe),
        };

        if config.dimension == 0 || config.top_k == 0 {
            return Err(Error::Configuration(
                "RAG_INDEX_DIMENSION and RAG_SEARCH_TOP_K must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// gRPC endpoint of the index engine
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Collection name, namespaced by database unless it is `default`
    pub fn collection_name(&self) -> String {
        if self.database.is_empty() || self.database == "default" {
            self.collection.clone()
        } else {
            format!("{}_{}", self.database, self.collection)
        }
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
