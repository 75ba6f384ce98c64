//! # Rocville Infrastructure
//!
//! Wiring for the resilience primitives in `rocville-common`.
//!
//! This crate contains:
//! - Configuration loading (JSON/TOML files plus `ROCVILLE_*` overrides)
//! - Tracing subscriber setup
//! - The Redis shared-tier backend (`redis` feature)
//! - [`ResilienceRuntime`], the composition root callers share

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod observability;
pub mod store;

// Re-export commonly used items
pub use bootstrap::{ResilienceRuntime, SharedCache};
pub use config::{AppConfig, CacheSettings, LoggingConfig, SharedBackend};
pub use error::{InfraError, InfraResult};
