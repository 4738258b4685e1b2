//! Redis-backed counter store for the distributed limiter.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use gatekeep_core::ports::{CounterStore, StoreError};

/// Counter store on Redis `GET` / `SET PX` / `INCR`.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCounterStore {
    /// Share a connection already opened for the cache. Every key is stored
    /// as `<key_prefix>:<key>`.
    pub fn from_connection(conn: ConnectionManager, key_prefix: &str) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.to_string(),
        }
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(self.make_key(key)).await.map_err(unavailable)?;
        Ok(value.unwrap_or(0))
    }

    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let millis = (ttl.as_millis() as u64).max(1);
        conn.pset_ex::<_, _, ()>(self.make_key(key), 1u64, millis)
            .await
            .map_err(unavailable)
    }

    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        conn.incr(self.make_key(key), 1u64).await.map_err(unavailable)
    }
}
