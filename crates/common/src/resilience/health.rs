//! Background error-count decay

use std::sync::{Arc, Weak};

use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::ResilienceRegistry;
use crate::time::Clock;

/// Outcome of one [`ResilienceRegistry::health_check`] tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCheckReport {
    /// Keys visited
    pub tracked: usize,
    /// Keys whose error count was decremented
    pub decayed: usize,
    /// Breakers closed because their cool-down elapsed
    pub breakers_reset: usize,
}

/// Handle to a running health-check task
///
/// Dropping the handle cancels the task; [`shutdown`](Self::shutdown) also
/// waits for it to finish.
#[derive(Debug)]
pub struct HealthCheckHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HealthCheckHandle {
    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Token that stops the task when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => task.await,
            None => Ok(()),
        }
    }
}

impl Drop for HealthCheckHandle {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!("Health check handle dropped; cancelling task");
            self.cancel.cancel();
        }
    }
}

impl<C: Clock> ResilienceRegistry<C> {
    /// Spawn a task that calls [`health_check`](Self::health_check) every
    /// `health_check_interval`
    ///
    /// The task holds only a weak reference, so it also stops once the last
    /// `Arc` to the registry is dropped. Must be called from within a tokio
    /// runtime.
    pub fn spawn_health_check(self: &Arc<Self>) -> HealthCheckHandle {
        let period = self.config().health_check_interval;
        let registry = Arc::downgrade(self);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!(interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX), "Starting health check task");
        let task = tokio::spawn(health_check_loop(registry, period, token));

        HealthCheckHandle { cancel, task: Some(task) }
    }
}

async fn health_check_loop<C: Clock>(
    registry: Weak<ResilienceRegistry<C>>,
    period: std::time::Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Health check task cancelled");
                break;
            }
            _ = ticker.tick() => {
                let Some(registry) = registry.upgrade() else {
                    warn!("Registry dropped; stopping health check task");
                    break;
                };
                registry.health_check();
            }
        }
    }
}
