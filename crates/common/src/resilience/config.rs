//! Retry and circuit breaker configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::utils::{duration_millis, option_duration_millis};

/// Tuning for a [`super::ResilienceRegistry`]
///
/// Durations are serialized as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Retries after the first attempt (a sequence makes `max_retries + 1` calls)
    pub max_retries: u32,
    /// Base backoff delay; attempt `n` waits `retry_delay * 2^n`
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,
    /// Error count at which an exhausted sequence opens the breaker
    pub circuit_breaker_threshold: u64,
    /// Period of the error-count decay task
    #[serde(with = "duration_millis")]
    pub health_check_interval: Duration,
    /// How long an open breaker stays open
    #[serde(with = "duration_millis")]
    pub breaker_cooldown: Duration,
    /// Optional deadline for each individual attempt
    #[serde(with = "option_duration_millis", skip_serializing_if = "Option::is_none")]
    pub attempt_timeout: Option<Duration>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            circuit_breaker_threshold: 5,
            health_check_interval: Duration::from_secs(30),
            breaker_cooldown: Duration::from_secs(60),
            attempt_timeout: None,
        }
    }
}

impl ResilienceConfig {
    /// Create a configuration builder
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.circuit_breaker_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker_threshold",
                "must be greater than 0",
            ));
        }

        if self.health_check_interval.is_zero() {
            return Err(ConfigError::invalid("health_check_interval", "must be greater than 0"));
        }

        if self.attempt_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::invalid("attempt_timeout", "must be greater than 0 when set"));
        }

        Ok(())
    }

    /// Backoff before retry number `attempt` (zero-based)
    ///
    /// Saturates instead of overflowing for large attempt numbers.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_delay.saturating_mul(factor)
    }
}

/// Builder for [`ResilienceConfig`]
#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    /// Start from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries after the first attempt
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Base backoff delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Error count that opens the breaker
    pub fn circuit_breaker_threshold(mut self, threshold: u64) -> Self {
        self.config.circuit_breaker_threshold = threshold;
        self
    }

    /// Period of the decay task
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.config.health_check_interval = interval;
        self
    }

    /// How long a breaker stays open
    pub fn breaker_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.breaker_cooldown = cooldown;
        self
    }

    /// Per-attempt deadline
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.attempt_timeout = Some(timeout);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<ResilienceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
