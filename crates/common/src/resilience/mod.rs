//! Retry, circuit breaking and graceful degradation for flaky upstreams
//!
//! [`ResilienceRegistry`] tracks state per operation key:
//! - the retry count of the sequence currently in flight,
//! - a recent error count, decayed by a periodic health check,
//! - a circuit breaker that opens once an exhausted sequence leaves the error
//!   count at or above the threshold, and closes again after a cool-down.
//!
//! ```
//! # tokio_test::block_on(async {
//! use std::time::Duration;
//!
//! use rocville_common::resilience::{ResilienceConfig, ResilienceRegistry};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("upstream unavailable")]
//! struct Unavailable;
//!
//! let config = ResilienceConfig::builder()
//!     .max_retries(1)
//!     .retry_delay(Duration::from_millis(1))
//!     .build()
//!     .unwrap();
//! let registry = ResilienceRegistry::new(config).unwrap();
//!
//! let score = registry
//!     .with_fallback(
//!         "esg:data:ACME",
//!         || async { Err::<u32, _>(Unavailable) },
//!         || async { Ok(0) },
//!     )
//!     .await;
//!
//! assert_eq!(score.unwrap(), 0);
//! assert_eq!(registry.status().error_count("primary_esg:data:ACME"), 2);
//! # });
//! ```
//!
//! State is per registry instance. Several processes sharing an upstream each
//! keep their own breaker.

mod config;
mod error;
mod health;
mod registry;
mod status;

pub use config::{ResilienceConfig, ResilienceConfigBuilder};
pub use error::{ResilienceError, ResilienceResult};
pub use health::{HealthCheckHandle, HealthCheckReport};
pub use registry::ResilienceRegistry;
pub use status::ResilienceStatus;
