//! Per-key retry and circuit breaker bookkeeping

use std::fmt;
use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};

use super::config::ResilienceConfig;
use super::error::{ResilienceError, ResilienceResult};
use super::health::HealthCheckReport;
use super::status::ResilienceStatus;
use crate::error::ConfigResult;
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone, Default)]
struct OperationState {
    retry_attempts: Option<u32>,
    error_count: u64,
    opened_at: Option<Instant>,
    opened_at_wall: Option<DateTime<Utc>>,
}

impl OperationState {
    fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    fn close(&mut self) {
        self.opened_at = None;
        self.opened_at_wall = None;
        self.error_count = 0;
    }
}

enum AttemptFailure<E> {
    Error(E),
    TimedOut(std::time::Duration),
}

impl<E: fmt::Display> fmt::Display for AttemptFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Error(error) => write!(f, "{error}"),
            AttemptFailure::TimedOut(limit) => write!(f, "attempt timed out after {limit:?}"),
        }
    }
}

/// Retry, circuit breaker and fallback manager keyed by operation name
///
/// One registry is built per process and shared by `Arc`. State for a key is
/// created on first use and lives as long as the registry. Each update to a
/// key's state happens under that key's shard lock, so concurrent calls never
/// lose increments; whole retry sequences for the same key are not serialized.
///
/// Breakers reset lazily: the first access after `breaker_cooldown` (or the
/// next [`health_check`](Self::health_check)) closes the breaker and clears
/// the error count.
pub struct ResilienceRegistry<C: Clock = SystemClock> {
    config: ResilienceConfig,
    operations: DashMap<String, OperationState>,
    clock: C,
}

impl<C: Clock> fmt::Debug for ResilienceRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilienceRegistry")
            .field("config", &self.config)
            .field("tracked_operations", &self.operations.len())
            .finish()
    }
}

impl ResilienceRegistry<SystemClock> {
    /// Create a registry using the system clock
    pub fn new(config: ResilienceConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a registry with the default configuration
    pub fn with_defaults() -> Self {
        Self::from_parts(ResilienceConfig::default(), SystemClock)
    }
}

impl Default for ResilienceRegistry<SystemClock> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<C: Clock> ResilienceRegistry<C> {
    /// Create a registry with a custom clock (useful for testing cool-downs)
    pub fn with_clock(config: ResilienceConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, clock))
    }

    fn from_parts(config: ResilienceConfig, clock: C) -> Self {
        Self { config, operations: DashMap::new(), clock }
    }

    /// Active configuration
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Clock used for breaker cool-downs
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run `operation` with retries and circuit breaking under `key`
    ///
    /// Makes up to `max_retries + 1` sequential attempts, waiting
    /// `retry_delay * 2^n` before retry `n`. Every failure increments the
    /// key's error count; a success resets it. When a sequence is exhausted
    /// and the error count has reached the threshold the breaker opens, and
    /// calls fail with [`ResilienceError::CircuitOpen`] without invoking the
    /// operation until the cool-down elapses.
    pub async fn retry_operation<F, Fut, T, E>(
        &self,
        key: &str,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.retry_operation_with_context(key, None, operation).await
    }

    /// [`retry_operation`](Self::retry_operation) with caller context
    /// attached to the tracing span (ticker, user id, request id).
    #[instrument(skip_all, fields(key = %key, context = ?context))]
    pub async fn retry_operation_with_context<F, Fut, T, E>(
        &self,
        key: &str,
        context: Option<&(dyn fmt::Debug + Sync)>,
        mut operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut attempt: u32 = 0;

        loop {
            if self.is_circuit_open(key) {
                self.clear_retry(key);
                debug!("Circuit breaker open, rejecting call");
                return Err(ResilienceError::CircuitOpen { key: key.to_owned() });
            }

            let outcome = match self.config.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(result) => result.map_err(AttemptFailure::Error),
                    Err(_) => Err(AttemptFailure::TimedOut(limit)),
                },
                None => operation().await.map_err(AttemptFailure::Error),
            };

            let failure = match outcome {
                Ok(value) => {
                    self.record_success(key);
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let error_count = self.record_failure(key);

            if attempt < self.config.max_retries {
                let delay = self.config.backoff_delay(attempt);
                attempt += 1;
                self.record_retry(key, attempt);
                debug!(
                    attempt,
                    error_count,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %failure,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let attempts = attempt + 1;
            let opened = self.finish_exhausted(key);
            warn!(attempts, error_count, breaker_opened = opened, error = %failure, "Retries exhausted");

            return Err(match failure {
                AttemptFailure::Error(source) => {
                    ResilienceError::RetriesExhausted { key: key.to_owned(), attempts, source }
                }
                AttemptFailure::TimedOut(timeout) => {
                    ResilienceError::TimedOut { key: key.to_owned(), attempts, timeout }
                }
            });
        }
    }

    /// Run `primary` under `primary_<key>`; on any failure run `fallback` once
    ///
    /// The fallback is not retried or circuit-protected, and its result (or
    /// error) is returned as-is.
    pub async fn with_fallback<P, PFut, F, FFut, T, E>(
        &self,
        key: &str,
        primary: P,
        fallback: F,
    ) -> Result<T, E>
    where
        P: FnMut() -> PFut,
        PFut: Future<Output = Result<T, E>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let primary_key = format!("primary_{key}");
        match self.retry_operation(&primary_key, primary).await {
            Ok(value) => Ok(value),
            Err(error) => {
                warn!(key = %primary_key, error = %error, "Primary operation failed, using fallback");
                fallback().await
            }
        }
    }

    /// Whether the breaker for `key` is open
    ///
    /// Closes the breaker first if its cool-down has elapsed.
    pub fn is_circuit_open(&self, key: &str) -> bool {
        let Some(mut state) = self.operations.get_mut(key) else {
            return false;
        };
        if !state.is_open() {
            return false;
        }
        if self.cooldown_elapsed(&state, self.clock.now()) {
            state.close();
            info!(key, "Circuit breaker reset after cool-down");
            return false;
        }
        true
    }

    /// Current error count for `key`
    pub fn error_count(&self, key: &str) -> u64 {
        self.operations.get(key).map_or(0, |state| state.error_count)
    }

    /// Number of keys the registry has seen
    pub fn tracked_operations(&self) -> usize {
        self.operations.len()
    }

    /// Close the breaker for `key` and clear its error count
    ///
    /// Returns `true` if the key was tracked.
    pub fn reset(&self, key: &str) -> bool {
        match self.operations.get_mut(key) {
            Some(mut state) => {
                let was_open = state.is_open();
                state.close();
                state.retry_attempts = None;
                if was_open {
                    info!(key, "Circuit breaker manually reset");
                }
                true
            }
            None => false,
        }
    }

    /// One decay tick
    ///
    /// Decrements every tracked error count by one (floored at zero) and
    /// closes breakers whose cool-down has elapsed. Normally driven by
    /// [`spawn_health_check`](Self::spawn_health_check).
    pub fn health_check(&self) -> HealthCheckReport {
        let now = self.clock.now();
        let mut report = HealthCheckReport::default();

        for mut entry in self.operations.iter_mut() {
            report.tracked += 1;

            if entry.is_open() && self.cooldown_elapsed(&entry, now) {
                entry.close();
                report.breakers_reset += 1;
                info!(key = %entry.key(), "Circuit breaker reset after cool-down");
                continue;
            }

            if entry.error_count > 0 {
                entry.error_count -= 1;
                report.decayed += 1;
            }
        }

        debug!(
            tracked = report.tracked,
            decayed = report.decayed,
            breakers_reset = report.breakers_reset,
            "Health check complete"
        );
        report
    }

    /// Snapshot of retries, breakers and error counts
    ///
    /// Does not mutate state; breakers past their cool-down are reported as
    /// closed with a zero error count.
    pub fn status(&self) -> ResilienceStatus {
        let now = self.clock.now();
        let mut status = ResilienceStatus::default();

        for entry in self.operations.iter() {
            let key = entry.key();
            let state = entry.value();
            let expired = state.is_open() && self.cooldown_elapsed(state, now);
            let open = state.is_open() && !expired;

            if let Some(retries) = state.retry_attempts {
                status.active_retries.insert(key.clone(), retries);
            }
            status.circuit_breakers.insert(key.clone(), open);
            status.error_counts.insert(key.clone(), if expired { 0 } else { state.error_count });
            if let (true, Some(at)) = (open, state.opened_at_wall) {
                status.open_since.insert(key.clone(), at);
            }
        }

        status
    }

    fn cooldown_elapsed(&self, state: &OperationState, now: Instant) -> bool {
        state
            .opened_at
            .is_some_and(|at| now.saturating_duration_since(at) >= self.config.breaker_cooldown)
    }

    fn record_success(&self, key: &str) {
        let mut state = self.operations.entry(key.to_owned()).or_default();
        state.retry_attempts = None;
        state.error_count = 0;
    }

    fn record_failure(&self, key: &str) -> u64 {
        let mut state = self.operations.entry(key.to_owned()).or_default();
        state.error_count = state.error_count.saturating_add(1);
        state.error_count
    }

    fn record_retry(&self, key: &str, retries: u32) {
        self.operations.entry(key.to_owned()).or_default().retry_attempts = Some(retries);
    }

    fn clear_retry(&self, key: &str) {
        if let Some(mut state) = self.operations.get_mut(key) {
            state.retry_attempts = None;
        }
    }

    /// Clears the in-flight retry count and opens the breaker if the
    /// threshold is reached. Returns whether this call opened it.
    fn finish_exhausted(&self, key: &str) -> bool {
        let mut state = self.operations.entry(key.to_owned()).or_default();
        state.retry_attempts = None;

        if state.is_open() || state.error_count < self.config.circuit_breaker_threshold {
            return false;
        }

        state.opened_at = Some(self.clock.now());
        state.opened_at_wall = Some(self.clock.utc_now());
        warn!(
            key,
            error_count = state.error_count,
            threshold = self.config.circuit_breaker_threshold,
            cooldown_ms = u64::try_from(self.config.breaker_cooldown.as_millis()).unwrap_or(u64::MAX),
            "Circuit breaker opened"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::time::MockClock;

    #[derive(Debug, thiserror::Error)]
    #[error("upstream error {0}")]
    struct Upstream(u32);

    fn fast_config(max_retries: u32, threshold: u64) -> ResilienceConfig {
        ResilienceConfig::builder()
            .max_retries(max_retries)
            .retry_delay(Duration::from_millis(1))
            .circuit_breaker_threshold(threshold)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let registry = ResilienceRegistry::new(fast_config(3, 5)).unwrap();

        let value = registry.retry_operation("quote", || async { Ok::<_, Upstream>(42) }).await;

        assert_eq!(value.unwrap(), 42);
        assert_eq!(registry.error_count("quote"), 0);
        assert!(!registry.status().is_retrying("quote"));
    }

    #[tokio::test]
    async fn test_exhausted_sequence_makes_max_retries_plus_one_calls() {
        let registry = ResilienceRegistry::new(fast_config(2, 100)).unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let err = registry
            .retry_operation("quote", || {
                let calls = Arc::clone(&calls);
                async move { Err::<(), _>(Upstream(calls.fetch_add(1, Ordering::SeqCst))) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            ResilienceError::RetriesExhausted { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.0, 2, "last error is surfaced");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(registry.error_count("quote"), 3);
        assert!(!registry.is_circuit_open("quote"));
    }

    #[tokio::test]
    async fn test_breaker_rejects_without_invoking() {
        let registry = ResilienceRegistry::new(fast_config(0, 1)).unwrap();
        let _ = registry.retry_operation("did", || async { Err::<(), _>(Upstream(1)) }).await;
        assert!(registry.is_circuit_open("did"));

        let calls = AtomicU32::new(0);
        let err = registry
            .retry_operation("did", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Upstream>(()) }
            })
            .await
            .unwrap_err();

        assert!(err.is_circuit_open());
        assert_eq!(err.key(), "did");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cooldown_closes_breaker() {
        let clock = MockClock::new();
        let config = ResilienceConfig::builder()
            .max_retries(0)
            .circuit_breaker_threshold(1)
            .breaker_cooldown(Duration::from_secs(60))
            .build()
            .unwrap();
        let registry = ResilienceRegistry::with_clock(config, clock.clone()).unwrap();

        let _ = registry.retry_operation("esg", || async { Err::<(), _>(Upstream(0)) }).await;
        assert!(registry.is_circuit_open("esg"));
        assert!(registry.status().open_since.contains_key("esg"));

        clock.advance(Duration::from_secs(59));
        assert!(registry.is_circuit_open("esg"));

        clock.advance(Duration::from_secs(1));
        assert!(!registry.status().is_open("esg"));
        assert!(!registry.is_circuit_open("esg"));
        assert_eq!(registry.error_count("esg"), 0);
    }

    #[tokio::test]
    async fn test_health_check_decays_and_floors_at_zero() {
        let registry = ResilienceRegistry::new(fast_config(1, 10)).unwrap();
        let _ = registry.retry_operation("carbon", || async { Err::<(), _>(Upstream(0)) }).await;
        assert_eq!(registry.error_count("carbon"), 2);

        let report = registry.health_check();
        assert_eq!(report.tracked, 1);
        assert_eq!(report.decayed, 1);
        assert_eq!(registry.error_count("carbon"), 1);

        registry.health_check();
        registry.health_check();
        assert_eq!(registry.error_count("carbon"), 0);
    }

    #[tokio::test]
    async fn test_health_check_resets_expired_breaker() {
        let clock = MockClock::new();
        let config = ResilienceConfig::builder()
            .max_retries(0)
            .circuit_breaker_threshold(1)
            .breaker_cooldown(Duration::from_secs(5))
            .build()
            .unwrap();
        let registry = ResilienceRegistry::with_clock(config, clock.clone()).unwrap();
        let _ = registry.retry_operation("news", || async { Err::<(), _>(Upstream(0)) }).await;

        clock.advance(Duration::from_secs(5));
        let report = registry.health_check();

        assert_eq!(report.breakers_reset, 1);
        assert!(!registry.status().is_open("news"));
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_failure() {
        let config = ResilienceConfig::builder()
            .max_retries(0)
            .attempt_timeout(Duration::from_millis(10))
            .build()
            .unwrap();
        let registry = ResilienceRegistry::new(config).unwrap();

        let err = registry
            .retry_operation("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Upstream>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ResilienceError::TimedOut { attempts: 1, .. }));
        assert_eq!(registry.error_count("slow"), 1);
    }

    fn paced_config(max_retries: u32) -> ResilienceConfig {
        ResilienceConfig::builder()
            .max_retries(max_retries)
            .retry_delay(Duration::from_millis(100))
            .circuit_breaker_threshold(100)
            .build()
            .unwrap()
    }

    /// Validates that `status()` reports the retry count while a sequence is
    /// sleeping between attempts, and drops it once the sequence succeeds
    ///
    /// # Test Steps
    /// 1. Fail twice, then succeed (backoff 100ms then 200ms)
    /// 2. Sample during the first backoff: one retry in flight
    /// 3. Sample during the second backoff: two retries in flight
    /// 4. After success the key is no longer retrying
    #[tokio::test(start_paused = true)]
    async fn test_active_retries_visible_during_backoff_until_success() {
        let registry = ResilienceRegistry::new(paced_config(3)).unwrap();
        let calls = AtomicU32::new(0);

        let (result, samples) = tokio::join!(
            registry.retry_operation("quote", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { if call < 2 { Err(Upstream(call)) } else { Ok(call) } }
            }),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let first = registry.status().active_retries.get("quote").copied();
                tokio::time::sleep(Duration::from_millis(100)).await;
                let second = registry.status().active_retries.get("quote").copied();
                (first, second)
            }
        );

        assert_eq!(result.unwrap(), 2);
        assert_eq!(samples, (Some(1), Some(2)));
        assert!(!registry.status().active_retries.contains_key("quote"));
        assert_eq!(registry.error_count("quote"), 0);
    }

    /// Validates that the in-flight retry count is cleared when retries run out
    ///
    /// # Test Steps
    /// 1. Always fail with two retries allowed
    /// 2. Sample during each backoff
    /// 3. After exhaustion the key is no longer retrying but errors remain
    #[tokio::test(start_paused = true)]
    async fn test_active_retries_cleared_after_exhaustion() {
        let registry = ResilienceRegistry::new(paced_config(2)).unwrap();

        let (result, samples) = tokio::join!(
            registry.retry_operation("esg", || async { Err::<(), _>(Upstream(0)) }),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let first = registry.status().active_retries.get("esg").copied();
                tokio::time::sleep(Duration::from_millis(100)).await;
                let second = registry.status().active_retries.get("esg").copied();
                (first, second)
            }
        );

        assert!(matches!(result, Err(ResilienceError::RetriesExhausted { attempts: 3, .. })));
        assert_eq!(samples, (Some(1), Some(2)));
        let status = registry.status();
        assert!(!status.is_retrying("esg"));
        assert_eq!(status.error_count("esg"), 3);
    }

    #[tokio::test]
    async fn test_manual_reset() {
        let registry = ResilienceRegistry::new(fast_config(0, 1)).unwrap();
        let _ = registry.retry_operation("k", || async { Err::<(), _>(Upstream(0)) }).await;
        assert!(registry.is_circuit_open("k"));

        assert!(registry.reset("k"));
        assert!(!registry.is_circuit_open("k"));
        assert!(!registry.reset("unknown"));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ResilienceConfig { circuit_breaker_threshold: 0, ..Default::default() };
        assert!(ResilienceRegistry::new(config).is_err());
    }
}
