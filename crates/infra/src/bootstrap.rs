//! Runtime composition root
//!
//! [`ResilienceRuntime`] owns the one registry and the one tiered cache a
//! process shares, plus the background health-check task.

use std::sync::Arc;

use rocville_common::cache::{MemoryStore, SharedStore, TieredCache};
use rocville_common::resilience::{HealthCheckHandle, ResilienceRegistry, ResilienceStatus};
use tracing::{info, instrument};

use crate::config::{AppConfig, SharedBackend};
use crate::error::{InfraError, InfraResult};

/// Tiered cache over whichever shared backend was configured
pub type SharedCache = TieredCache<Arc<dyn SharedStore>>;

/// Registry, cache and health-check task built from an [`AppConfig`]
#[derive(Debug)]
pub struct ResilienceRuntime {
    registry: Arc<ResilienceRegistry>,
    cache: Arc<SharedCache>,
    health_check: HealthCheckHandle,
}

impl ResilienceRuntime {
    /// Validate `config`, connect the shared tier and start the health check
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `InfraError::Validation` for an invalid config,
    /// `InfraError::Cache` if the shared tier cannot be reached and
    /// `InfraError::Config` if the configured backend is not compiled in.
    #[instrument(skip_all, fields(backend = config.cache.backend.name()))]
    pub async fn start(config: &AppConfig) -> InfraResult<Self> {
        config.validate()?;

        let store = build_store(&config.cache.backend).await?;
        let cache = Arc::new(TieredCache::new(store, config.cache.tiered.clone())?);
        let registry = Arc::new(ResilienceRegistry::new(config.resilience.clone())?);
        let health_check = registry.spawn_health_check();

        info!(
            max_retries = config.resilience.max_retries,
            circuit_breaker_threshold = config.resilience.circuit_breaker_threshold,
            default_ttl_secs = config.cache.tiered.default_ttl.as_secs(),
            "Resilience runtime started"
        );

        Ok(Self { registry, cache, health_check })
    }

    /// Shared registry for retry keys
    pub fn registry(&self) -> &Arc<ResilienceRegistry> {
        &self.registry
    }

    /// Shared tiered cache
    pub fn cache(&self) -> &Arc<SharedCache> {
        &self.cache
    }

    /// Snapshot of retry and breaker state
    pub fn status(&self) -> ResilienceStatus {
        self.registry.status()
    }

    /// Whether the health-check task is still running
    pub fn is_running(&self) -> bool {
        self.health_check.is_running()
    }

    /// Stop the health-check task and wait for it
    ///
    /// # Errors
    /// Returns `InfraError::Task` if the task panicked.
    pub async fn shutdown(self) -> InfraResult<()> {
        self.health_check.shutdown().await?;
        info!("Resilience runtime stopped");
        Ok(())
    }
}

async fn build_store(backend: &SharedBackend) -> InfraResult<Arc<dyn SharedStore>> {
    match backend {
        SharedBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "redis")]
        SharedBackend::Redis { url } => {
            let store = crate::store::RedisStore::connect(url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        SharedBackend::Redis { .. } => Err(InfraError::config(
            "Redis shared tier requested but rocville-infra was built without the `redis` feature",
        )),
    }
}
