//! Embedding cache keyed by text fingerprint
//!
//! Uses `moka` for a concurrent map with optional capacity and TTL bounds.
//! Without bounds the cache grows for the lifetime of its owner.

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::CacheConfig;

/// Fingerprint of a text: SHA-256 hex of its lower-cased form.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.to_lowercase().as_bytes());
    format!("{:x}", digest)
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Concurrent fingerprint -> vector cache
pub struct EmbeddingCache {
    entries: Cache<String, Vec<f32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// Cache with no eviction.
    pub fn unbounded() -> Self {
        Self::new(&CacheConfig::default())
    }

    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder();
        if let Some(max_entries) = config.max_entries {
            builder = builder.max_capacity(max_entries);
        }
        if let Some(ttl_secs) = config.ttl_secs {
            builder = builder.time_to_live(Duration::from_secs(ttl_secs));
        }

        Self {
            entries: builder.build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, fingerprint: &str) -> Option<Vec<f32>> {
        let found = self.entries.get(fingerprint).await;
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a vector; a concurrent write for the same key may replace it.
    pub async fn insert(&self, fingerprint: String, vector: Vec<f32>) {
        self.entries.insert(fingerprint, vector).await;
    }

    pub async fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.entry_count(),
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
