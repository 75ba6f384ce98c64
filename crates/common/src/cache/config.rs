//! Tiered cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::utils::duration_secs;

/// How long promoted and written entries live in the local tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalTtlPolicy {
    /// Expire local entries together with the shared entry
    #[default]
    MirrorShared,
    /// Keep local entries until invalidated, cleared or evicted
    Unbounded,
}

/// Configuration for [`super::TieredCache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieredCacheConfig {
    /// TTL used by `set_default_ttl`, in seconds when serialized
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Local tier expiry policy
    pub local_ttl: LocalTtlPolicy,
    /// Upper bound on local entries; least recently used entries are evicted
    pub local_max_entries: Option<usize>,
}

impl Default for TieredCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            local_ttl: LocalTtlPolicy::MirrorShared,
            local_max_entries: None,
        }
    }
}

impl TieredCacheConfig {
    /// Create a configuration builder
    pub fn builder() -> TieredCacheConfigBuilder {
        TieredCacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_ttl.is_zero() {
            return Err(ConfigError::invalid("default_ttl", "must be greater than 0"));
        }

        if self.local_max_entries == Some(0) {
            return Err(ConfigError::invalid(
                "local_max_entries",
                "must be greater than 0 when set",
            ));
        }

        Ok(())
    }

    /// Local tier lifetime for an entry written with `shared_ttl`
    pub(crate) fn local_ttl_for(&self, shared_ttl: Option<Duration>) -> Option<Duration> {
        match self.local_ttl {
            LocalTtlPolicy::MirrorShared => shared_ttl,
            LocalTtlPolicy::Unbounded => None,
        }
    }
}

/// Builder for [`TieredCacheConfig`]
#[derive(Debug, Default)]
pub struct TieredCacheConfigBuilder {
    config: TieredCacheConfig,
}

impl TieredCacheConfigBuilder {
    /// TTL used when callers do not pass one
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Local tier expiry policy
    pub fn local_ttl(mut self, policy: LocalTtlPolicy) -> Self {
        self.config.local_ttl = policy;
        self
    }

    /// Bound the local tier with LRU eviction
    pub fn local_max_entries(mut self, max_entries: usize) -> Self {
        self.config.local_max_entries = Some(max_entries);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<TieredCacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
