//! In-memory cache implementation - used when Redis is disabled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use gatekeep_core::ports::{Cache, CacheError};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory cache using a HashMap behind an async RwLock.
///
/// Expired entries read as absent and are removed on access.
/// Data is lost on process restart and is not shared between instances.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let store = self.store.read().await;
            match store.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Re-check under the write lock; a concurrent set may have refreshed it.
        let mut store = self.store.write().await;
        if store.get(key).is_some_and(|entry| entry.is_expired(now)) {
            store.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|d| Instant::now() + d);

        let mut store = self.store.write().await;
        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }
}
