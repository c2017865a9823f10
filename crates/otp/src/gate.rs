use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use ttlgate_common::{OtpConfig, TtlGateError, TtlGateResult};
use ttlgate_store::ExpiringStore;

use crate::delivery::CodeDelivery;
use crate::generator::generate_code;
use crate::OtpProvider;

/// Issues one-time codes per identity and checks them.
///
/// Codes live in an [`ExpiringStore`] keyed by identity with a fixed TTL.
/// Issuing again for the same identity replaces the previous code. In
/// single-use mode (the default) a successful verification removes the code,
/// atomically with the comparison, so a code can be redeemed at most once.
pub struct CodeGate {
    codes: ExpiringStore<String>,
    delivery: Arc<dyn CodeDelivery>,
    length: usize,
    ttl: Duration,
    single_use: bool,
}

impl CodeGate {
    pub fn new(
        codes: ExpiringStore<String>,
        delivery: Arc<dyn CodeDelivery>,
        length: usize,
        ttl: Duration,
    ) -> TtlGateResult<Self> {
        if length == 0 {
            return Err(TtlGateError::Config("code length must be positive".into()));
        }
        if ttl.is_zero() {
            return Err(TtlGateError::Config("code ttl must be positive".into()));
        }

        Ok(Self {
            codes,
            delivery,
            length,
            ttl,
            single_use: true,
        })
    }

    pub fn from_config(
        config: &OtpConfig,
        codes: ExpiringStore<String>,
        delivery: Arc<dyn CodeDelivery>,
    ) -> TtlGateResult<Self> {
        Ok(Self::new(codes, delivery, config.length, config.ttl())?.single_use(config.single_use))
    }

    /// Keep (`false`) or remove (`true`) codes after a successful check.
    pub fn single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    /// Generate a code for `identity`, store it, and hand it to the delivery
    /// channel.
    ///
    /// If delivery fails the stored code is withdrawn again.
    pub fn issue(&self, identity: &str) -> TtlGateResult<()> {
        if identity.is_empty() {
            return Err(TtlGateError::InvalidInput("identity must not be empty".into()));
        }

        let code = generate_code(self.length);
        self.codes.set(identity, code.clone(), Some(self.ttl));

        if let Err(e) = self.delivery.deliver(identity, &code) {
            warn!(identity, error = %e, "code delivery failed, withdrawing code");
            let _ = self.codes.consume_if(identity, |stored| *stored == code);
            return Err(e);
        }

        debug!(identity, ttl_secs = self.ttl.as_secs(), "verification code issued");
        Ok(())
    }

    /// Returns `true` iff a live code exists for `identity` and equals
    /// `candidate` exactly.
    pub fn verify(&self, identity: &str, candidate: &str) -> bool {
        let outcome = if self.single_use {
            self.codes.consume_if(identity, |stored| stored == candidate)
        } else {
            self.codes.get(identity).map(|stored| stored == candidate)
        };

        match outcome {
            Ok(true) => {
                debug!(identity, "verification code accepted");
                true
            }
            Ok(false) => {
                debug!(identity, "verification code mismatch");
                false
            }
            Err(TtlGateError::Expired(_)) => {
                debug!(identity, "verification code expired");
                false
            }
            Err(TtlGateError::NotFound(_)) => {
                debug!(identity, "no verification code requested");
                false
            }
            Err(e) => {
                warn!(identity, error = %e, "verification lookup failed");
                false
            }
        }
    }

    /// Stop the code store's background reaper.
    pub async fn shutdown(&self) {
        self.codes.shutdown().await;
    }
}

impl OtpProvider for CodeGate {
    fn send(&self, identity: &str) -> TtlGateResult<()> {
        self.issue(identity)
    }

    fn check(&self, identity: &str, code: &str) -> bool {
        self.verify(identity, code)
    }
}
