//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! layering environment overrides on top.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use once_cell::sync::Lazy;
use rocville_infra::config::{self, AppConfig, SharedBackend};
use rocville_infra::InfraError;
use tempfile::NamedTempFile;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn write_config(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
            "resilience": {
                "max_retries": 2,
                "retry_delay": 200,
                "circuit_breaker_threshold": 4,
                "health_check_interval": 15000,
                "breaker_cooldown": 45000,
                "attempt_timeout": 3000
            },
            "cache": {
                "backend": {"kind": "redis", "url": "redis://:hunter2@cache:6379/1"},
                "tiered": {"default_ttl": 300, "local_ttl": "mirror_shared", "local_max_entries": 500}
            },
            "logging": {"filter": "info,rocville_common=debug", "json": true}
        }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    let config = result.expect("Failed to load config from JSON file");

    assert_eq!(config.resilience.max_retries, 2);
    assert_eq!(config.resilience.retry_delay, Duration::from_millis(200));
    assert_eq!(config.resilience.circuit_breaker_threshold, 4);
    assert_eq!(config.resilience.health_check_interval, Duration::from_secs(15));
    assert_eq!(config.resilience.breaker_cooldown, Duration::from_secs(45));
    assert_eq!(config.resilience.attempt_timeout, Some(Duration::from_secs(3)));

    assert_eq!(
        config.cache.backend,
        SharedBackend::Redis { url: "redis://:hunter2@cache:6379/1".to_string() }
    );
    assert_eq!(config.cache.tiered.default_ttl, Duration::from_secs(300));
    assert_eq!(config.cache.tiered.local_max_entries, Some(500));

    assert_eq!(config.logging.filter, "info,rocville_common=debug");
    assert!(config.logging.json);
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_config(
        r#"
[resilience]
max_retries = 0
retry_delay = 50

[cache.backend]
kind = "memory"

[cache.tiered]
default_ttl = 3600
local_ttl = "unbounded"
"#,
        "toml",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    let config = result.expect("Failed to load config from TOML file");

    assert_eq!(config.resilience.max_retries, 0);
    assert_eq!(config.resilience.retry_delay, Duration::from_millis(50));
    assert_eq!(config.resilience.circuit_breaker_threshold, 5, "unset fields keep defaults");
    assert_eq!(config.cache.backend, SharedBackend::Memory);
    assert_eq!(config.cache.tiered.default_ttl, Duration::from_secs(3600));
    assert_eq!(config.logging, AppConfig::default().logging);
}

#[test]
fn test_load_config_rejects_unknown_backend() {
    let path = write_config(r#"{"cache": {"backend": {"kind": "memcached"}}}"#, "json");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    assert!(matches!(result, Err(InfraError::Config(_))));
}

#[test]
fn test_load_config_rejects_bad_redis_url() {
    let path = write_config(
        r#"
[cache.backend]
kind = "redis"
url = "localhost:6379"
"#,
        "toml",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    match result {
        Err(InfraError::Validation(err)) => assert_eq!(err.field(), "cache.backend.url"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

/// Validates environment overrides layered over a file
///
/// # Test Steps
/// 1. Parse a file that selects the memory backend
/// 2. Set `REDIS_URL` and a retry override
/// 3. Apply overrides: env wins, untouched file values survive
#[test]
fn test_env_overrides_win_over_file() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

    let path = write_config(
        r#"{"resilience": {"max_retries": 1, "circuit_breaker_threshold": 9}}"#,
        "json",
    );
    let mut config = config::load_from_file(Some(path.clone())).expect("file should load");
    std::fs::remove_file(path).ok();

    std::env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
    std::env::set_var("ROCVILLE_MAX_RETRIES", "6");
    let result = config::apply_env_overrides(&mut config);
    std::env::remove_var("REDIS_URL");
    std::env::remove_var("ROCVILLE_MAX_RETRIES");

    result.expect("overrides should apply");
    assert_eq!(config.resilience.max_retries, 6);
    assert_eq!(config.resilience.circuit_breaker_threshold, 9);
    assert_eq!(config.cache.backend.name(), "redis");
}

#[test]
fn test_load_from_file_missing_path() {
    let result = config::load_from_file(Some(PathBuf::from("/definitely/not/here/rocville.toml")));
    assert!(matches!(result, Err(InfraError::Config(ref msg)) if msg.contains("not found")));
}
