//! Redis adapter for the session-plane cache port.
//!
//! A single multiplexed connection manager is shared across requests; it
//! reconnects on its own when the server drops the connection. SETEX,
//! EXPIRE, and TTL go through explicit commands so the integer argument
//! types are pinned.

use anyhow::Context;
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::domain::session::ports::{CacheError, KeyValueStore};

/// redis cache adapter
#[derive(Clone)]
pub struct Redis {
    manager: ConnectionManager,
}

impl Redis {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context(format!("invalid redis url: {}", url))?;
        let manager = ConnectionManager::new(client)
            .await
            .context(format!("failed to connect to redis at {}", url))?;
        Ok(Self { manager })
    }
}

impl KeyValueStore for Redis {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(CacheError::new)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_seconds)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(CacheError::new)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await.map_err(CacheError::new)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.sadd::<_, _, ()>(key, member)
            .await
            .map_err(CacheError::new)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.srem::<_, _, ()>(key, member)
            .await
            .map_err(CacheError::new)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.manager.clone();
        conn.smembers(key).await.map_err(CacheError::new)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds)
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(CacheError::new)
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let mut conn = self.manager.clone();
        let remaining: i64 = redis::cmd("TTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::new)?;
        // -1 = no expiry, -2 = no key
        Ok(u64::try_from(remaining).ok())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(CacheError::new)
    }
}
