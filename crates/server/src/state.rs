use std::sync::Arc;
use std::time::Instant;

use ttlgate_common::{AppConfig, DeliveryMode, TtlGateResult};
use ttlgate_otp::{CodeDelivery, CodeGate, ConsoleDelivery, OtpProvider, TracingDelivery};
use ttlgate_rate_limit::FixedWindowLimiter;
use ttlgate_store::{CounterStore, ExpiringStore};

/// Shared state type alias used across all route handlers.
pub type SharedState = Arc<AppState>;

/// Central application state: the code gate, the stores behind it, and the
/// optional request limiter.
pub struct AppState {
    pub otp: Arc<dyn OtpProvider>,
    pub codes: ExpiringStore<String>,
    pub counters: CounterStore,
    pub limiter: Option<Arc<FixedWindowLimiter>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        otp: Arc<dyn OtpProvider>,
        codes: ExpiringStore<String>,
        counters: CounterStore,
        limiter: Option<Arc<FixedWindowLimiter>>,
    ) -> Self {
        Self {
            otp,
            codes,
            counters,
            limiter,
            start_time: Instant::now(),
        }
    }

    /// Build every component described by `config`.
    ///
    /// Spawns the store reapers and the limiter's reset task, so this must
    /// run inside a Tokio runtime.
    pub fn from_config(config: &AppConfig) -> TtlGateResult<Self> {
        let sweep_interval = config.store.sweep_interval();
        let codes = ExpiringStore::with_reaper(sweep_interval)?;
        let counters = CounterStore::with_reaper(sweep_interval)?;

        let delivery: Arc<dyn CodeDelivery> = match config.otp.delivery {
            DeliveryMode::Console => Arc::new(ConsoleDelivery::stdout()),
            DeliveryMode::Log => Arc::new(TracingDelivery),
        };
        let gate = CodeGate::from_config(&config.otp, codes.clone(), delivery)?;

        let limiter = if config.rate_limit.enabled {
            let rl = &config.rate_limit;
            Some(Arc::new(FixedWindowLimiter::new(
                &rl.scope,
                rl.capacity,
                rl.window(),
                Arc::new(counters.clone()),
            )?))
        } else {
            None
        };

        Ok(Self::new(Arc::new(gate), codes, counters, limiter))
    }

    /// Stop every background task owned by this state and wait for them.
    pub async fn shutdown(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.shutdown().await;
        }
        self.codes.shutdown().await;
        self.counters.shutdown().await;
        tracing::info!("background tasks stopped");
    }
}
