//! One-time verification codes.
//!
//! [`CodeGate`] generates a numeric code per identity, keeps it in an
//! [`ExpiringStore`](ttlgate_store::ExpiringStore) for a bounded window, hands
//! it to a [`CodeDelivery`] channel, and later checks a candidate against it.

pub mod delivery;
pub mod gate;
pub mod generator;

use ttlgate_common::TtlGateResult;

pub use delivery::{CodeDelivery, ConsoleDelivery, TracingDelivery};
pub use gate::CodeGate;
pub use generator::generate_code;

/// Capability consumed by the HTTP layer.
pub trait OtpProvider: Send + Sync {
    /// Issue a fresh code for `identity` and deliver it.
    fn send(&self, identity: &str) -> TtlGateResult<()>;

    /// Returns `true` if `code` is the live code for `identity`.
    fn check(&self, identity: &str, code: &str) -> bool;
}
