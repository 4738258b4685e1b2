//! Read-through user cache.
//!
//! The cache never fetches on its own; [`IdentityResolver`](super::IdentityResolver)
//! owns the fallback to the repository. All backend failures degrade to a miss.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::User;
use crate::ports::{Cache, CacheError};

use super::DEFAULT_STAGE_TIMEOUT;

/// Default lifetime of a cached user snapshot.
pub const DEFAULT_USER_TTL: Duration = Duration::from_secs(60 * 60);

/// User cache over an optional [`Cache`] backend.
///
/// A disabled cache has no backend: `get` always misses and `set` does nothing.
#[derive(Clone)]
pub struct UserCache {
    backend: Option<Arc<dyn Cache>>,
    ttl: Duration,
    op_timeout: Duration,
}

impl UserCache {
    pub fn new(backend: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            ttl,
            op_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: DEFAULT_USER_TTL,
            op_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Build from the single enable flag.
    pub fn from_flag(enabled: bool, backend: Arc<dyn Cache>, ttl: Duration) -> Self {
        if enabled {
            Self::new(backend, ttl)
        } else {
            Self::disabled()
        }
    }

    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(user_id: i64) -> String {
        format!("user/{user_id}")
    }

    /// Cached user, or `None` on miss, expiry, timeout or backend failure.
    pub async fn get(&self, user_id: i64) -> Option<User> {
        let backend = self.backend.as_ref()?;
        let key = Self::key(user_id);

        let raw = match tokio::time::timeout(self.op_timeout, backend.get(&key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "User cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                tracing::warn!(key = %key, "User cache read timed out, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cached user");
                None
            }
        }
    }

    /// Store a fresh snapshot of `user`, overwriting any previous entry.
    pub async fn set(&self, user: &User) -> Result<(), CacheError> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(());
        };

        let value =
            serde_json::to_string(user).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let key = Self::key(user.id);

        tokio::time::timeout(self.op_timeout, backend.set(&key, &value, Some(self.ttl)))
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::domain::Role;

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl Cache for MapCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }
    }

    fn user() -> User {
        User::new(7, "gopher", "gopher@example.com", Role::new(1, "user", 1))
    }

    #[tokio::test]
    async fn test_set_then_get_returns_user() {
        let cache = UserCache::new(Arc::new(MapCache::default()), DEFAULT_USER_TTL);
        let user = user();

        cache.set(&user).await.unwrap();

        assert_eq!(cache.get(7).await, Some(user));
    }

    #[tokio::test]
    async fn test_double_set_is_idempotent() {
        let backend = Arc::new(MapCache::default());
        let cache = UserCache::new(backend.clone(), DEFAULT_USER_TTL);
        let user = user();

        cache.set(&user).await.unwrap();
        cache.set(&user).await.unwrap();

        assert_eq!(cache.get(7).await, Some(user));
        assert_eq!(backend.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_password_hash_not_cached() {
        let backend = Arc::new(MapCache::default());
        let cache = UserCache::new(backend.clone(), DEFAULT_USER_TTL);
        let mut user = user();
        user.password_hash = b"secret-hash".to_vec();

        cache.set(&user).await.unwrap();

        let raw = backend.entries.lock().await.get("user/7").cloned().unwrap();
        assert!(!raw.contains("password"));
        assert!(cache.get(7).await.unwrap().password_hash.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = UserCache::disabled();

        cache.set(&user()).await.unwrap();

        assert!(!cache.is_enabled());
        assert_eq!(cache.get(7).await, None);
    }

    #[tokio::test]
    async fn test_backend_failure_reads_as_miss() {
        let cache = UserCache::new(Arc::new(BrokenCache), DEFAULT_USER_TTL);

        assert_eq!(cache.get(7).await, None);
        assert!(cache.set(&user()).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_entry_reads_as_miss() {
        let backend = Arc::new(MapCache::default());
        backend.set("user/7", "not json", None).await.unwrap();
        let cache = UserCache::new(backend, DEFAULT_USER_TTL);

        assert_eq!(cache.get(7).await, None);
    }
}
