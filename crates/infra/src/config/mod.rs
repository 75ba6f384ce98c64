//! Configuration loading and management
//!
//! [`AppConfig`] aggregates the resilience, cache and logging settings. It is
//! read from a JSON or TOML file (see [`probe_config_paths`]) and then
//! overridden by environment variables; see [`loader`] for the list.

pub mod loader;

use rocville_common::{ConfigError, ConfigResult, ResilienceConfig, TieredCacheConfig};
use serde::{Deserialize, Serialize};

// Re-export commonly used items
pub use loader::{
    apply_env_overrides, load, load_from_env, load_from_file, probe_config_paths,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Retry, circuit breaker and health-check settings
    pub resilience: ResilienceConfig,
    /// Tiered cache settings
    pub cache: CacheSettings,
    /// Tracing output
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Validate every section
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.resilience.validate()?;
        self.cache.validate()?;
        self.logging.validate()
    }
}

/// Cache section: which shared backend to use and how the tiers behave
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Shared (durable) tier backend
    pub backend: SharedBackend,
    /// Local tier and TTL settings
    pub tiered: TieredCacheConfig,
}

impl CacheSettings {
    fn validate(&self) -> ConfigResult<()> {
        self.backend.validate()?;
        self.tiered.validate()
    }
}

/// Shared tier backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SharedBackend {
    /// In-process store; nothing is shared between instances
    #[default]
    Memory,
    /// Redis (or a wire-compatible server)
    Redis {
        /// Connection URL, e.g. `redis://127.0.0.1:6379`
        url: String,
    },
}

impl SharedBackend {
    /// Short backend name, matching `SharedStore::backend_name`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis { .. } => "redis",
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::Memory => Ok(()),
            Self::Redis { url } => {
                if url.starts_with("redis://")
                    || url.starts_with("rediss://")
                    || url.starts_with("redis+unix://")
                {
                    Ok(())
                } else {
                    Err(ConfigError::invalid(
                        "cache.backend.url",
                        "must start with redis://, rediss:// or redis+unix://",
                    ))
                }
            }
        }
    }
}

/// Tracing output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}

impl LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter", "must not be empty"));
        }
        Ok(())
    }
}
