//! Error types shared across modules
//!
//! Module-specific failures live next to the module that produces them
//! ([`crate::failover::FailoverError`], [`crate::resilience::ResilienceError`],
//! [`crate::cache::CacheError`]). This module only holds the validation error
//! returned by every configuration type's `validate()`.

use thiserror::Error;

/// A configuration value failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range
    #[error("Invalid configuration for `{field}`: {message}")]
    Invalid {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Build a [`ConfigError::Invalid`] for `field`
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid { field, message: message.into() }
    }

    /// Name of the field that failed validation
    pub fn field(&self) -> &'static str {
        match self {
            Self::Invalid { field, .. } => field,
        }
    }
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("circuit_breaker_threshold", "must be greater than 0");
        assert_eq!(err.field(), "circuit_breaker_threshold");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for `circuit_breaker_threshold`: must be greater than 0"
        );
    }
}
