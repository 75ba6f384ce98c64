//! Resilience primitives shared across Rocville services.
//!
//! Upstream-backed lookups (market quotes, ESG scores, DID resolution) are
//! built from three independent pieces:
//! - [`failover`]: try an ordered list of providers, first truthy success wins
//! - [`resilience`]: per-key retries with exponential backoff, circuit
//!   breaking, graceful fallback and a periodic error-count decay
//! - [`cache`]: a process-local tier in front of an expiring shared tier
//!
//! [`fetch`] composes them into the cache-then-failover-then-default pattern
//! used at every call site.
//!
//! # Safety and Quality
//!
//! No unsafe code. Library code propagates errors instead of panicking.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod error;
pub mod failover;
pub mod fetch;
pub mod resilience;
pub mod time;
pub mod utils;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use cache::{
    CacheError, CacheResult, LocalTtlPolicy, MemoryStore, SharedStore, TieredCache,
    TieredCacheConfig, TieredCacheStats,
};
pub use error::{ConfigError, ConfigResult};
pub use failover::{failover, FailoverChain, FailoverError, ProviderFailure, Truthy};
pub use fetch::{CachedFetch, FetchOrigin, Fetched};
pub use resilience::{
    HealthCheckHandle, ResilienceConfig, ResilienceError, ResilienceRegistry, ResilienceResult,
    ResilienceStatus,
};
pub use time::{Clock, MockClock, SystemClock};
