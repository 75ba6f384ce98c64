//! Errors surfaced by the retry and circuit-breaker registry

use std::time::Duration;

use thiserror::Error;

/// Errors produced by [`super::ResilienceRegistry::retry_operation`]
///
/// Generic over the wrapped operation's error so the last underlying failure
/// stays reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The breaker for `key` is open; the operation was not invoked
    #[error("Circuit breaker is open for {key}")]
    CircuitOpen {
        /// Operation key whose breaker rejected the call
        key: String,
    },

    /// Every attempt failed
    #[error("Operation {key} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Operation key
        key: String,
        /// Attempts made, including the first call
        attempts: u32,
        /// Error returned by the final attempt
        #[source]
        source: E,
    },

    /// The final attempt exceeded the configured per-attempt timeout
    #[error("Operation {key} timed out after {attempts} attempts ({timeout:?} per attempt)")]
    TimedOut {
        /// Operation key
        key: String,
        /// Attempts made, including the first call
        attempts: u32,
        /// Per-attempt limit that was exceeded
        timeout: Duration,
    },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Operation key the error refers to
    pub fn key(&self) -> &str {
        match self {
            Self::CircuitOpen { key }
            | Self::RetriesExhausted { key, .. }
            | Self::TimedOut { key, .. } => key,
        }
    }

    /// Whether the call was rejected by an open breaker
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// The last underlying error, if the operation ran and failed with one
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::RetriesExhausted { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Consume the error and return the last underlying error
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::RetriesExhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;
