//! Cancellable periodic background task.
//!
//! Both the store reaper and the limiter's window reset run on this
//! primitive. The task is spawned on the current Tokio runtime, ticks once per
//! period (the first tick fires one full period after spawning), and stops
//! when [`PeriodicTask::shutdown`] is awaited or the handle is dropped.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use ttlgate_common::{TtlGateError, TtlGateResult};

/// Handle to a running periodic task.
///
/// The tick closure returns:
/// - `Ok(())` to keep going,
/// - `Err(TtlGateError::Closed)` when its owner is gone, which ends the loop,
/// - any other error, which is logged and the loop continues at the next tick.
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// Spawn `tick` on the current Tokio runtime, once every `period`.
    ///
    /// Fails with [`TtlGateError::Config`] for a zero period and with
    /// [`TtlGateError::Task`] when called outside a runtime.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> TtlGateResult<Self>
    where
        F: FnMut() -> TtlGateResult<()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(TtlGateError::Config(format!(
                "{name}: period must be positive"
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TtlGateError::Task(format!("{name}: {e}")))?;

        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            debug!(task = name, period_ms = period.as_millis() as u64, "periodic task started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        debug!(task = name, "periodic task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match tick() {
                            Ok(()) => {}
                            Err(TtlGateError::Closed) => {
                                debug!(task = name, "owner dropped, periodic task exiting");
                                break;
                            }
                            Err(e) => {
                                warn!(task = name, error = %e, "periodic tick failed");
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            name,
            period,
            cancel,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` until the task has been cancelled or has exited.
    pub fn is_running(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal cancellation and wait for the task to exit.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(task = self.name, error = %e, "periodic task did not exit cleanly");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
