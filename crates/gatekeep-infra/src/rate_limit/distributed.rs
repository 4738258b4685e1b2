//! Fixed-window rate limiter over a shared counter store.

use std::sync::Arc;

use async_trait::async_trait;

use gatekeep_core::ports::{CounterStore, RateLimitError, RateLimitResult, RateLimiter};

use super::RateLimitConfig;

/// Fixed-window limiter whose counters live in a [`CounterStore`] shared by
/// every service instance, giving one global quota per key.
///
/// Store failures are returned, never swallowed: the caller must not admit a
/// request whose quota could not be checked. A denial reports the full window
/// as retry-after rather than the exact remaining time.
pub struct DistributedFixedWindowLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl DistributedFixedWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[async_trait]
impl RateLimiter for DistributedFixedWindowLimiter {
    async fn allow(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let max = u64::from(self.config.max_requests());
        let count = self.store.get(key).await?;

        if count == 0 {
            self.store.set_with_ttl(key, self.config.window()).await?;
            return Ok(RateLimitResult::permit(
                self.config.max_requests().saturating_sub(1),
            ));
        }

        if count < max {
            let current = self.store.increment(key).await?;
            let remaining = max.saturating_sub(current) as u32;
            return Ok(RateLimitResult::permit(remaining));
        }

        Ok(RateLimitResult::deny(self.config.window()))
    }
}
