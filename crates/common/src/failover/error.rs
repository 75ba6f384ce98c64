//! Failover error types

use std::fmt;

use thiserror::Error;

/// Why a single provider did not satisfy the request
#[derive(Debug)]
pub enum FailureCause<E> {
    /// The provider returned an error
    Error(E),
    /// The provider succeeded but returned an empty value
    Empty,
}

impl<E: fmt::Display> fmt::Display for FailureCause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Error(error) => write!(f, "{error}"),
            FailureCause::Empty => write!(f, "empty result"),
        }
    }
}

/// Diagnostic record for one provider that was tried and skipped
#[derive(Debug)]
pub struct ProviderFailure<E> {
    /// Provider name (or `provider[<position>]` for unnamed providers)
    pub provider: String,
    /// Zero-based position in the provider list
    pub position: usize,
    /// What went wrong
    pub cause: FailureCause<E>,
}

impl<E> ProviderFailure<E> {
    /// The provider's error, if it failed with one
    pub fn error(&self) -> Option<&E> {
        match &self.cause {
            FailureCause::Error(error) => Some(error),
            FailureCause::Empty => None,
        }
    }

    /// Whether the provider answered with an empty value
    pub fn is_empty_result(&self) -> bool {
        matches!(self.cause, FailureCause::Empty)
    }
}

/// Errors returned by the failover executor
#[derive(Debug, Error)]
pub enum FailoverError<E> {
    /// Every provider failed or returned an empty value (or there were none)
    #[error("All providers failed ({} attempted)", .failures.len())]
    AllProvidersFailed {
        /// One entry per provider that was tried, in list order
        failures: Vec<ProviderFailure<E>>,
    },
}

impl<E> FailoverError<E> {
    /// Per-provider diagnostics, in the order the providers were tried
    pub fn failures(&self) -> &[ProviderFailure<E>] {
        match self {
            FailoverError::AllProvidersFailed { failures } => failures,
        }
    }

    /// Number of providers that were tried
    pub fn attempted(&self) -> usize {
        self.failures().len()
    }

    /// Consume the error and return the per-provider diagnostics
    pub fn into_failures(self) -> Vec<ProviderFailure<E>> {
        match self {
            FailoverError::AllProvidersFailed { failures } => failures,
        }
    }
}

/// Result type for failover operations
pub type FailoverResult<T, E> = Result<T, FailoverError<E>>;
