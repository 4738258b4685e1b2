//! In-process fixed-window rate limiter.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use gatekeep_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window limiter keeping one counter per key in process memory.
///
/// Each key's window is updated under its DashMap shard lock, so concurrent
/// requests for the same key never lose an increment. Limits are per-process,
/// not shared across instances. Call [`sweep`](Self::sweep) periodically to
/// drop keys whose windows have expired.
pub struct LocalFixedWindowLimiter {
    windows: DashMap<String, Window>,
    config: RateLimitConfig,
}

impl LocalFixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of keys currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Count one request for `key` at `now`.
    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let max = self.config.max_requests();
        let span = self.config.window();
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        let elapsed = now.saturating_duration_since(window.started);
        if window.count == 0 || elapsed >= span {
            window.count = 1;
            window.started = now;
            return RateLimitResult::permit(max.saturating_sub(1));
        }

        if window.count >= max {
            return RateLimitResult::deny(span.saturating_sub(elapsed));
        }

        window.count += 1;
        RateLimitResult::permit(max.saturating_sub(window.count))
    }

    /// Drop every key whose window has expired. Returns how many were removed.
    ///
    /// An expired window and an absent one behave identically, so sweeping
    /// never changes a decision.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window();
        let before = self.windows.len();

        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "Swept expired rate-limit windows");
        }
        removed
    }

    /// Time left in the current window for `key`, if one is open.
    pub fn remaining_window(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.windows.get(key).and_then(|w| {
            self.config
                .window()
                .checked_sub(now.saturating_duration_since(w.started))
                .filter(|d| !d.is_zero())
        })
    }
}

#[async_trait]
impl RateLimiter for LocalFixedWindowLimiter {
    async fn allow(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.check_at(key, Instant::now()))
    }
}
