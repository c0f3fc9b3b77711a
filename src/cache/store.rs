// =============================================================================
// Key/value store capability
// =============================================================================
//
// String keys, opaque string values, optional expiry.  `RedisStore` is the
// production backend; `MemoryStore` is a TTL-aware map for tests.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::IntoConnectionInfo;
use tracing::info;

use crate::error::CacheError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value atomically.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

// =============================================================================
// Redis
// =============================================================================

/// Redis over a multiplexed, auto-reconnecting connection.
///
/// `ConnectionManager` is cheap to clone and safe to share between tasks, so
/// each command works on its own clone.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `addr` (`host:port`) and verify the server answers PING.
    pub async fn connect(addr: &str, password: Option<&str>) -> Result<Self, CacheError> {
        let mut info = format!("redis://{addr}/").into_connection_info()?;
        if let Some(pass) = password.filter(|p| !p.is_empty()) {
            info.redis.password = Some(pass.to_string());
        }

        let client = redis::Client::open(info)?;
        let mut conn = client.get_connection_manager().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(addr = %addr, reply = %pong, "Connected to cache");

        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[cfg(test)]
pub use memory::MemoryStore;
