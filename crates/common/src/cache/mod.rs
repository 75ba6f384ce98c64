//! Two-tier cache for upstream responses
//!
//! A process-local tier sits in front of an expiring shared tier (Redis in
//! production, [`MemoryStore`] otherwise). Keys follow
//! `<namespace>:<operation>:<params>`, for example `esg:data:ACME` or
//! `did:resolve:did:web:example.com`.
//!
//! The shared tier is authoritative for expiry. The local tier mirrors the
//! shared TTL by default; [`LocalTtlPolicy::Unbounded`] keeps local entries
//! until they are invalidated or evicted.
//!
//! A shared tier outage surfaces as [`CacheError::Unavailable`]. Callers
//! normally log it and treat the read as a miss, which is what
//! [`crate::fetch::CachedFetch`] does.

mod config;
mod error;
mod local;
mod stats;
mod store;
mod tiered;

pub use config::{LocalTtlPolicy, TieredCacheConfig, TieredCacheConfigBuilder};
pub use error::{CacheError, CacheResult};
pub use stats::TieredCacheStats;
pub use store::{MemoryStore, SharedStore, StoredValue};
pub use tiered::TieredCache;
