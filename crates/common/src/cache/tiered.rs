//! Two-tier read-through cache

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::config::TieredCacheConfig;
use super::error::CacheResult;
use super::local::{LocalTier, Lookup};
use super::stats::{MetricsCollector, TieredCacheStats};
use super::store::SharedStore;
use crate::error::ConfigResult;
use crate::time::{Clock, SystemClock};

/// Local map in front of an expiring shared store
///
/// Reads check the local tier, then the shared tier; a shared hit is
/// promoted locally without touching the shared TTL. Writes go to both tiers,
/// local first. Values are stored as JSON.
///
/// ```
/// # tokio_test::block_on(async {
/// use std::time::Duration;
///
/// use rocville_common::cache::{MemoryStore, TieredCache, TieredCacheConfig};
///
/// let cache = TieredCache::new(MemoryStore::new(), TieredCacheConfig::default()).unwrap();
///
/// cache.set("market:quote:AAPL", &187.42, Duration::from_secs(60)).await.unwrap();
/// let quote: Option<f64> = cache.get("market:quote:AAPL").await.unwrap();
///
/// assert_eq!(quote, Some(187.42));
/// # });
/// ```
pub struct TieredCache<S, C = SystemClock>
where
    S: SharedStore,
    C: Clock,
{
    local: LocalTier,
    store: S,
    config: TieredCacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<S: SharedStore, C: Clock> std::fmt::Debug for TieredCache<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("backend", &self.store.backend_name())
            .field("config", &self.config)
            .field("local_size", &self.local.len())
            .finish()
    }
}

impl<S: SharedStore> TieredCache<S, SystemClock> {
    /// Create a cache over `store` using the system clock
    pub fn new(store: S, config: TieredCacheConfig) -> ConfigResult<Self> {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: SharedStore, C: Clock> TieredCache<S, C> {
    /// Create a cache with a custom clock for local expiry
    pub fn with_clock(store: S, config: TieredCacheConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            local: LocalTier::new(config.local_max_entries),
            store,
            config,
            metrics: MetricsCollector::default(),
            clock,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &TieredCacheConfig {
        &self.config
    }

    /// The shared tier
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up `key`
    ///
    /// Returns `Ok(None)` when neither tier holds a live entry. Fails with
    /// [`super::CacheError::Unavailable`] if the local tier misses and the
    /// shared tier cannot be reached.
    #[instrument(level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.local.get(key, self.clock.now()) {
            Lookup::Hit(value) => {
                self.metrics.record_local_hit();
                debug!("Local tier hit");
                return Ok(Some(serde_json::from_value(value)?));
            }
            Lookup::Expired => self.metrics.record_expirations(1),
            Lookup::Miss => {}
        }

        let stored = match self.store.get(key).await {
            Ok(stored) => stored,
            Err(error) => {
                self.metrics.record_shared_error();
                warn!(backend = self.store.backend_name(), error = %error, "Shared tier read failed");
                return Err(error);
            }
        };

        let Some(stored) = stored else {
            self.metrics.record_miss();
            debug!("Cache miss");
            return Ok(None);
        };

        let value: Value = serde_json::from_str(&stored.payload)?;
        let typed = serde_json::from_value(value.clone())?;

        let local_ttl = self.config.local_ttl_for(stored.expires_in);
        if self.local.insert(key, value, local_ttl, self.clock.now()) {
            self.metrics.record_evictions(1);
        }
        self.metrics.record_shared_hit();
        debug!("Shared tier hit, promoted to local tier");

        Ok(Some(typed))
    }

    /// Write `value` to both tiers with `ttl`
    ///
    /// The local tier is updated even if the shared write then fails.
    #[instrument(level = "debug", skip(self, value), fields(ttl_secs = ttl.as_secs()))]
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        let payload = serde_json::to_string(&value)?;

        let local_ttl = self.config.local_ttl_for(Some(ttl));
        if self.local.insert(key, value, local_ttl, self.clock.now()) {
            self.metrics.record_evictions(1);
        }

        if let Err(error) = self.store.set_with_expiry(key, payload, ttl).await {
            self.metrics.record_shared_error();
            warn!(backend = self.store.backend_name(), error = %error, "Shared tier write failed");
            return Err(error);
        }

        self.metrics.record_write();
        Ok(())
    }

    /// Write `value` with the configured default TTL
    pub async fn set_default_ttl<T>(&self, key: &str, value: &T) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set(key, value, self.config.default_ttl).await
    }

    /// Remove `key` from both tiers
    #[instrument(level = "debug", skip(self))]
    pub async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.local.remove(key);
        if let Err(error) = self.store.remove(key).await {
            self.metrics.record_shared_error();
            warn!(backend = self.store.backend_name(), error = %error, "Shared tier delete failed");
            return Err(error);
        }
        Ok(())
    }

    /// Drop every local entry; the shared tier is untouched
    pub fn clear_local(&self) {
        self.local.clear();
    }

    /// Whether the local tier holds a live entry for `key`
    pub fn contains_local(&self, key: &str) -> bool {
        self.local.contains(key, self.clock.now())
    }

    /// Remove expired local entries; returns how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.local.cleanup_expired(self.clock.now());
        if removed > 0 {
            self.metrics.record_expirations(removed as u64);
            debug!(removed, "Removed expired local entries");
        }
        removed
    }

    /// Current statistics
    pub fn stats(&self) -> TieredCacheStats {
        self.metrics.snapshot(self.local.len())
    }
}
