//! Configuration loader
//!
//! Loads [`AppConfig`] from a file (or defaults) and applies environment
//! overrides on top.
//!
//! ## Loading Strategy
//! 1. Probe the standard locations for a config file
//! 2. Fall back to [`AppConfig::default`] when none exists
//! 3. Apply environment overrides
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `ROCVILLE_MAX_RETRIES`: Retries after the first attempt
//! - `ROCVILLE_RETRY_DELAY_MS`: Base backoff delay in milliseconds
//! - `ROCVILLE_CIRCUIT_BREAKER_THRESHOLD`: Error count that opens a breaker
//! - `ROCVILLE_HEALTH_CHECK_INTERVAL_MS`: Error-count decay period
//! - `ROCVILLE_BREAKER_COOLDOWN_MS`: How long a breaker stays open
//! - `ROCVILLE_ATTEMPT_TIMEOUT_MS`: Per-attempt deadline
//! - `ROCVILLE_CACHE_TTL_SECS`: Default cache TTL in seconds
//! - `ROCVILLE_CACHE_LOCAL_MAX_ENTRIES`: LRU bound for the local tier
//! - `ROCVILLE_LOG`: Tracing filter directives (`RUST_LOG` still wins)
//! - `ROCVILLE_LOG_JSON`: Emit JSON logs (true/false)
//! - `REDIS_URL`: Use Redis as the shared tier
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./rocville.json` or `./rocville.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. The same names relative to the executable

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::{AppConfig, SharedBackend};
use crate::error::{InfraError, InfraResult};

/// Load configuration from the first config file found (or defaults), then
/// apply environment overrides
///
/// # Errors
/// Returns `InfraError::Config` if a file exists but cannot be parsed or an
/// override is malformed, and `InfraError::Validation` if the merged
/// configuration is invalid.
pub fn load() -> InfraResult<AppConfig> {
    let mut config = match probe_config_paths() {
        Some(path) => read_config(&path)?,
        None => {
            tracing::info!("No config file found, using defaults");
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from defaults plus environment variables only
///
/// # Errors
/// Returns `InfraError::Config` if an override is malformed, and
/// `InfraError::Validation` if the result is invalid.
pub fn load_from_env() -> InfraResult<AppConfig> {
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config)?;
    config.validate()?;

    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and
/// TOML (detected by extension). Environment overrides are not applied.
///
/// # Errors
/// Returns `InfraError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
///
/// Returns `InfraError::Validation` if the parsed values are out of range.
pub fn load_from_file(path: Option<PathBuf>) -> InfraResult<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(InfraError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            InfraError::config("No config file found in any of the standard locations")
        })?,
    };

    let config = read_config(&config_path)?;
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> InfraResult<AppConfig> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| InfraError::config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> InfraResult<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| InfraError::config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| InfraError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(InfraError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_paths(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_paths(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_paths(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("rocville.json"),
        dir.join("rocville.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Apply `ROCVILLE_*` and `REDIS_URL` overrides to `config`
///
/// Unset or empty variables leave the current value alone.
///
/// # Errors
/// Returns `InfraError::Config` naming the variable if a value does not
/// parse.
pub fn apply_env_overrides(config: &mut AppConfig) -> InfraResult<()> {
    let resilience = &mut config.resilience;
    if let Some(retries) = env_parse("ROCVILLE_MAX_RETRIES")? {
        resilience.max_retries = retries;
    }
    if let Some(ms) = env_parse("ROCVILLE_RETRY_DELAY_MS")? {
        resilience.retry_delay = Duration::from_millis(ms);
    }
    if let Some(threshold) = env_parse("ROCVILLE_CIRCUIT_BREAKER_THRESHOLD")? {
        resilience.circuit_breaker_threshold = threshold;
    }
    if let Some(ms) = env_parse("ROCVILLE_HEALTH_CHECK_INTERVAL_MS")? {
        resilience.health_check_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = env_parse("ROCVILLE_BREAKER_COOLDOWN_MS")? {
        resilience.breaker_cooldown = Duration::from_millis(ms);
    }
    if let Some(ms) = env_parse("ROCVILLE_ATTEMPT_TIMEOUT_MS")? {
        resilience.attempt_timeout = Some(Duration::from_millis(ms));
    }

    let tiered = &mut config.cache.tiered;
    if let Some(secs) = env_parse("ROCVILLE_CACHE_TTL_SECS")? {
        tiered.default_ttl = Duration::from_secs(secs);
    }
    if let Some(max) = env_parse("ROCVILLE_CACHE_LOCAL_MAX_ENTRIES")? {
        tiered.local_max_entries = Some(max);
    }
    if let Some(url) = env_string("REDIS_URL") {
        config.cache.backend = SharedBackend::Redis { url };
    }

    if let Some(filter) = env_string("ROCVILLE_LOG") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("ROCVILLE_LOG_JSON", config.logging.json);

    Ok(())
}

/// Read a non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `InfraError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> InfraResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| InfraError::config(format!("Invalid {key} ({raw}): {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
