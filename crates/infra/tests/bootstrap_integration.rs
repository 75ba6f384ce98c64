//! Integration tests for the runtime composition root
//!
//! Starts a [`ResilienceRuntime`] from configuration and drives the shared
//! registry and cache the way service call sites do.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rocville_common::failover::FailoverChain;
use rocville_common::fetch::{CachedFetch, FetchOrigin};
use rocville_infra::{AppConfig, InfraError, ResilienceRuntime};

#[derive(Debug, thiserror::Error)]
#[error("upstream returned 503")]
struct Upstream;

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.resilience.max_retries = 1;
    config.resilience.retry_delay = Duration::from_millis(1);
    config.resilience.circuit_breaker_threshold = 2;
    config.resilience.health_check_interval = Duration::from_secs(60);
    config
}

#[tokio::test]
async fn test_start_with_defaults_uses_memory_backend() -> anyhow::Result<()> {
    let runtime = ResilienceRuntime::start(&AppConfig::default()).await?;

    assert!(runtime.is_running());
    assert_eq!(runtime.cache().store().backend_name(), "memory");
    assert_eq!(runtime.cache().config().default_ttl, Duration::from_secs(60));
    assert!(runtime.status().circuit_breakers.is_empty());

    runtime.shutdown().await?;
    Ok(())
}

/// Validates that call sites share one registry and one cache
///
/// # Test Steps
/// 1. Fetch a quote through the runtime cache; the first provider fails
/// 2. A second fetch is served from cache
/// 3. A failing guarded operation opens its breaker in the shared status
#[tokio::test]
async fn test_runtime_shares_cache_and_registry() -> anyhow::Result<()> {
    let runtime = ResilienceRuntime::start(&fast_config()).await?;
    let provider_calls = Arc::new(AtomicU32::new(0));

    let chain = |calls: Arc<AtomicU32>| {
        FailoverChain::<f64, String>::new()
            .provider("alpha_vantage", || async { Err("rate limited".to_string()) })
            .provider("finnhub", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(187.42)
            })
    };

    let fetch = CachedFetch::new(runtime.cache(), "market:quote:AAPL", Duration::from_secs(30));
    let first = fetch.fetch(chain(Arc::clone(&provider_calls))).await?;
    assert_eq!(first.origin, FetchOrigin::Provider("finnhub".to_string()));

    let second = fetch.fetch(chain(Arc::clone(&provider_calls))).await?;
    assert!(second.is_cached());
    assert_eq!(second.value, 187.42);
    assert_eq!(provider_calls.load(Ordering::SeqCst), 1);

    let registry = Arc::clone(runtime.registry());
    let result = registry
        .retry_operation("did:resolve", || async { Err::<(), _>(Upstream) })
        .await;
    assert!(result.is_err());

    let status = runtime.status();
    assert!(status.is_open("did:resolve"));
    assert_eq!(status.error_count("did:resolve"), 2);

    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_health_check_task_decays_errors() -> anyhow::Result<()> {
    let mut config = fast_config();
    config.resilience.max_retries = 0;
    config.resilience.circuit_breaker_threshold = 10;
    config.resilience.health_check_interval = Duration::from_millis(50);
    let runtime = ResilienceRuntime::start(&config).await?;

    for _ in 0..3 {
        let _ = runtime
            .registry()
            .retry_operation("esg:data:ACME", || async { Err::<(), _>(Upstream) })
            .await;
    }
    assert_eq!(runtime.status().error_count("esg:data:ACME"), 3);

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(runtime.status().error_count("esg:data:ACME"), 1);
    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_health_check() -> anyhow::Result<()> {
    let runtime = ResilienceRuntime::start(&fast_config()).await?;
    let registry = Arc::clone(runtime.registry());

    runtime.shutdown().await?;

    // The registry outlives the runtime; only the background task stops.
    assert_eq!(registry.tracked_operations(), 0);
    Ok(())
}

#[cfg(not(feature = "redis"))]
#[tokio::test]
async fn test_redis_backend_without_feature_fails_fast() {
    let mut config = AppConfig::default();
    config.cache.backend =
        rocville_infra::SharedBackend::Redis { url: "redis://127.0.0.1:6379".to_string() };

    let result = ResilienceRuntime::start(&config).await;
    assert!(matches!(result, Err(InfraError::Config(_))));
}
