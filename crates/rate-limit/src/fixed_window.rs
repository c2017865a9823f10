use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tracing::{debug, trace, warn};
use ttlgate_common::{TtlGateError, TtlGateResult};
use ttlgate_store::{CounterStateManager, KeyValueStateManager, PeriodicTask};

use crate::RateLimiter;

/// A fixed-window rate limiter over a shared counter store.
///
/// The scope counter starts at `capacity` and every admitted request takes
/// one unit from it. A background task resets it to `capacity` once per
/// `window`, on a fixed clock tick measured from construction. There is no
/// gradual refill: within a window at most `capacity` requests are admitted,
/// and all of them share the same reset boundary.
///
/// Per-identity counters ([`allow_for`](FixedWindowLimiter::allow_for)) are
/// created lazily at `capacity` and dropped on every tick, so the next request
/// recreates them full.
pub struct FixedWindowLimiter {
    scope: String,
    key: String,
    capacity: i64,
    window: Duration,
    counters: Arc<dyn CounterStateManager>,
    tracked: Arc<DashSet<String>>,
    reset: PeriodicTask,
}

impl FixedWindowLimiter {
    /// Create a limiter for `scope` and start its reset task.
    ///
    /// * `capacity` - requests admitted per window, must be positive
    /// * `window`   - reset period, must be non-zero
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        scope: &str,
        capacity: i64,
        window: Duration,
        counters: Arc<dyn CounterStateManager>,
    ) -> TtlGateResult<Self> {
        if scope.is_empty() {
            return Err(TtlGateError::Config("rate limiter scope must not be empty".into()));
        }
        if capacity <= 0 {
            return Err(TtlGateError::Config(format!(
                "rate limiter capacity must be positive (got {capacity})"
            )));
        }
        if window.is_zero() {
            return Err(TtlGateError::Config("rate limiter window must be positive".into()));
        }

        let key = scope_key(scope);
        counters.set(&key, capacity, None)?;

        let tracked: Arc<DashSet<String>> = Arc::new(DashSet::new());

        let reset = {
            let counters = Arc::clone(&counters);
            let tracked = Arc::clone(&tracked);
            let key = key.clone();
            PeriodicTask::spawn("rate-limit-reset", window, move || {
                counters.set(&key, capacity, None)?;

                let mut cleared = 0usize;
                tracked.retain(|tracked_key| {
                    if let Err(e) = counters.delete(tracked_key) {
                        warn!(key = %tracked_key, error = %e, "failed to reset identity counter");
                    }
                    cleared += 1;
                    false
                });

                trace!(key = %key, capacity, cleared, "rate limit window reset");
                Ok(())
            })?
        };

        tracing::info!(scope, capacity, window_ms = window.as_millis() as u64, "creating fixed window rate limiter");

        Ok(Self {
            scope: scope.to_string(),
            key,
            capacity,
            window,
            counters,
            tracked,
            reset,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Units left in the current window for the scope counter.
    pub fn remaining(&self) -> TtlGateResult<i64> {
        self.counters.get(&self.key)
    }

    /// Admit one request against the scope-wide counter.
    pub fn allow(&self) -> bool {
        self.admit(&self.key)
    }

    /// Admit one request against `identity`'s own counter within this scope.
    pub fn allow_for(&self, identity: &str) -> bool {
        let key = identity_key(&self.scope, identity);

        match self.counters.set_if_absent(&key, self.capacity, None) {
            Ok(_) => {
                self.tracked.insert(key.clone());
            }
            Err(e) => {
                warn!(scope = %self.scope, identity, error = %e, "failed to initialise identity counter, denying");
                return false;
            }
        }

        self.admit(&key)
    }

    /// Stop the reset task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.reset.shutdown().await;
    }

    fn admit(&self, key: &str) -> bool {
        match self.counters.decr_if_positive(key) {
            Ok(Some(remaining)) => {
                trace!(key, remaining, "request admitted");
                true
            }
            Ok(None) => {
                debug!(key, "rate limit exceeded");
                false
            }
            Err(e) if e.is_miss() => {
                debug!(key, error = %e, "rate limit counter missing, denying");
                false
            }
            Err(e) => {
                warn!(key, error = %e, "rate limit counter unavailable, denying");
                false
            }
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self) -> bool {
        FixedWindowLimiter::allow(self)
    }

    fn allow_for(&self, identity: &str) -> bool {
        FixedWindowLimiter::allow_for(self, identity)
    }
}

fn scope_key(scope: &str) -> String {
    format!("{scope}::rate-limiter::fixed-window::bucket")
}

fn identity_key(scope: &str, identity: &str) -> String {
    format!("{scope}::rate-limiter::fixed-window::id::{identity}")
}
