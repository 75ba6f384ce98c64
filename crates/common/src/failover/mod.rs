//! Multi-provider failover
//!
//! Given an ordered list of providers for the same logical operation, try
//! each one at most once and return the first success. A provider counts as
//! successful only if it returns `Ok` with a [`Truthy`] value; errors and
//! empty answers move on to the next provider. When every provider fails the
//! executor returns [`FailoverError::AllProvidersFailed`] carrying one
//! [`ProviderFailure`] per provider tried.
//!
//! This module performs no retries, caching or logging. Wrap a chain with
//! [`crate::resilience::ResilienceRegistry`] for retries, or use
//! [`crate::fetch::CachedFetch`] for the cache-then-failover pattern.

mod error;
mod executor;
mod truthy;

pub use error::{FailoverError, FailoverResult, FailureCause, ProviderFailure};
pub use executor::{failover, BoxedProvider, FailoverChain, ProviderFuture, ProviderSuccess};
pub use truthy::Truthy;
