//! Rate limiting port.

use async_trait::async_trait;
use std::time::Duration;

/// Rate limiter trait - abstraction over rate limiting backends.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a request against `key` and report whether it is permitted.
    async fn allow(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the caller may retry. Zero when allowed.
    pub retry_after: Duration,
}

impl RateLimitResult {
    pub fn permit(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after: Duration::ZERO,
        }
    }

    pub fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after,
        }
    }
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<super::StoreError> for RateLimitError {
    fn from(err: super::StoreError) -> Self {
        RateLimitError::Backend(err.to_string())
    }
}
