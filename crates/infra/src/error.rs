//! Errors raised while wiring the runtime

use rocville_common::{CacheError, ConfigError};
use thiserror::Error;

/// Infrastructure-level error
#[derive(Debug, Error)]
pub enum InfraError {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration value failed validation
    #[error(transparent)]
    Validation(#[from] ConfigError),

    /// The shared cache tier could not be reached
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A background task panicked or was aborted
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl InfraError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result alias for infrastructure operations
pub type InfraResult<T> = Result<T, InfraError>;
