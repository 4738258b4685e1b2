//! Shared counter store port - backs the distributed rate limiter.

use async_trait::async_trait;
use std::time::Duration;

/// Counter store shared between service instances.
///
/// `increment` must be atomic in the backing store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current count for `key`; zero when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<u64, StoreError>;

    /// Initialize the counter for `key` to 1, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically bump the counter and return the new count.
    async fn increment(&self, key: &str) -> Result<u64, StoreError>;
}

/// Counter store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
