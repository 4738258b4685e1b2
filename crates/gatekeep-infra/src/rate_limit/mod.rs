//! Fixed-window rate limiting - process-local and distributed variants.
//!
//! Both implement [`gatekeep_core::ports::RateLimiter`]; callers pick one at
//! wiring time via [`RateLimitMode`] and never branch on it afterwards.

mod counter;
mod distributed;
mod local;

use std::time::Duration;

pub use counter::InMemoryCounterStore;
pub use distributed::DistributedFixedWindowLimiter;
pub use local::LocalFixedWindowLimiter;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::RedisCounterStore;

/// Quota shared by both limiter variants. `max_requests` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window: Duration::from_secs(5),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            Duration::from_secs(
                std::env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        )
    }
}

/// Where rate-limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitMode {
    /// Per-process counters; each instance enforces its own quota.
    Local,
    /// Shared counters in an external store; one global quota per key.
    Distributed,
}

impl std::str::FromStr for RateLimitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "distributed" | "redis" => Ok(Self::Distributed),
            other => Err(format!("unknown rate limit mode: {other}")),
        }
    }
}

impl std::fmt::Display for RateLimitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Distributed => f.write_str("distributed"),
        }
    }
}
