//! In-memory counter store with per-key expiry.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use gatekeep_core::ports::{CounterStore, StoreError};

struct Counter {
    value: u64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| now < exp)
    }
}

/// Counter store kept in process memory.
///
/// Mirrors the semantics of the Redis store (`GET`, `SET .. PX`, `INCR`) so the
/// distributed limiter can run without Redis, e.g. in tests or single-node
/// deployments.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        let value = self
            .counters
            .get(key)
            .filter(|c| c.is_live(now))
            .map(|c| c.value)
            .unwrap_or(0);
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.counters.insert(
            key.to_string(),
            Counter {
                value: 1,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            value: 0,
            expires_at: None,
        });

        // An expired key behaves as missing: INCR starts over without a TTL.
        if !counter.is_live(now) {
            counter.value = 0;
            counter.expires_at = None;
        }
        counter.value += 1;
        Ok(counter.value)
    }
}
