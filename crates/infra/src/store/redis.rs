//! Redis shared tier
//!
//! Uses `redis::aio::ConnectionManager` for a multiplexed connection that
//! reconnects on its own. Every backend error maps to
//! [`CacheError::Unavailable`] so the tiered cache and fetch helpers treat it
//! as an outage.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use rocville_common::cache::{CacheError, CacheResult, SharedStore, StoredValue};
use tracing::debug;

use super::redact_url;

/// Redis-backed [`SharedStore`]
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: ConnectionManager,
    url: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.url)
            .field("connection_manager", &"ConnectionManager")
            .finish()
    }
}

impl RedisStore {
    /// Connect to `url`
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] if the URL is malformed or the
    /// server cannot be reached.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::unavailable(format!("Failed to create Redis client: {e}")))?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::unavailable(format!("Failed to connect to Redis: {e}")))?;

        let url = redact_url(url);
        debug!(url = %url, "Redis shared tier connected");

        Ok(Self { connection_manager, url })
    }

    /// Connection URL with the password redacted
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>> {
        let mut conn = self.connection_manager.clone();
        let (payload, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::unavailable(format!("Redis GET failed: {e}")))?;

        Ok(payload.map(|payload| StoredValue { payload, expires_in: remaining_ttl(pttl) }))
    }

    async fn set_with_expiry(&self, key: &str, payload: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection_manager.clone();
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("PX")
            .arg(ttl_millis)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::unavailable(format!("Redis SET failed: {e}")))?;

        debug!(key = key, ttl_millis = ttl_millis, "Shared tier SET");
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection_manager.clone();

        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::unavailable(format!("Redis DEL failed: {e}")))?;

        Ok(removed > 0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Convert a `PTTL` reply; `-1` (no expiry) and `-2` (missing) carry no TTL
fn remaining_ttl(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl).ok().map(Duration::from_millis)
}
