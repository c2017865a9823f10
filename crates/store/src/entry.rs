use std::time::{Duration, Instant};

/// A stored value together with the instant it stops being visible.
///
/// `expiry == None` means the entry never expires. A TTL of zero is treated
/// the same as no TTL, which keeps "never expires" distinct from an entry
/// whose deadline has already passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    pub value: V,
    pub expiry: Option<Instant>,
}

impl<V> Entry<V> {
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expiry: deadline(Instant::now(), ttl),
        }
    }

    /// An entry is logically absent once `now` reaches its expiry.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expiry, Some(at) if now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time left before expiry, `None` for entries without one.
    pub fn remaining(&self) -> Option<Duration> {
        self.expiry
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Absolute deadline for a TTL starting at `now`.
///
/// Zero and out-of-range TTLs yield no deadline.
pub(crate) fn deadline(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.filter(|ttl| !ttl.is_zero())
        .and_then(|ttl| now.checked_add(ttl))
}
