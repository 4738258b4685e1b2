//! Redis-backed string cache and the connection settings shared with the
//! distributed rate-limit counters.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ErrorKind, RedisError};

use gatekeep_core::ports::{Cache, CacheError};

const DEFAULT_URL: &str = "redis://localhost:6379";

/// Where Redis lives and whether to use it.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// `REDIS_ENABLED=false` keeps every Redis adapter out of the wiring.
    pub enabled: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            enabled: true,
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let connect_timeout = std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout);
        let enabled = match std::env::var("REDIS_ENABLED") {
            Ok(v) => matches!(v.as_str(), "true" | "1"),
            Err(_) => defaults.enabled,
        };

        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connect_timeout,
            enabled,
        }
    }

    /// Open a managed connection. An unreachable server fails after
    /// `connect_timeout` instead of hanging startup.
    pub async fn connect(&self) -> Result<ConnectionManager, RedisError> {
        let client = Client::open(self.url.as_str())?;
        match tokio::time::timeout(self.connect_timeout, ConnectionManager::new(client)).await {
            Ok(conn) => conn,
            Err(_) => Err(RedisError::from((
                ErrorKind::IoError,
                "Redis connect timed out",
            ))),
        }
    }
}

fn op_error(err: RedisError) -> CacheError {
    if err.is_timeout() {
        CacheError::Timeout
    } else if err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Operation(err.to_string())
    }
}

/// [`Cache`] over a Redis `ConnectionManager`, which reconnects on its own.
///
/// TTLs are written with millisecond precision (`SET .. PX`), so sub-second
/// entries expire when asked to.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let conn = config
            .connect()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        tracing::info!(url = %config.url, "User cache backed by Redis");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(op_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let written: Result<(), RedisError> = match ttl {
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                conn.pset_ex(key, value, millis).await
            }
            None => conn.set(key, value).await,
        };
        written.map_err(op_error)
    }
}
