//! In-memory keyed state with time-based expiry.
//!
//! This crate provides the storage core shared by the verification-code gate
//! and the rate limiter:
//!
//! - [`ExpiringStore`] -- a concurrent string-keyed map whose entries carry an
//!   optional absolute expiry. Expired entries are invisible to every accessor
//!   and are evicted lazily on access.
//!
//! - [`CounterStore`] -- an `i64` specialisation with atomic `incr`, `decr`
//!   and `decr_if_positive`.
//!
//! - [`Reaper`] -- an optional background sweep that evicts expired entries
//!   nobody reads again, built on the cancellable [`PeriodicTask`].
//!
//! Both stores use [`DashMap`](dashmap::DashMap), so each instance has its own
//! sharded reader/writer locks and nothing is shared between unrelated stores.

pub mod counter;
pub mod entry;
pub mod expiring;
pub mod reaper;
pub mod task;

use std::time::Duration;

use ttlgate_common::TtlGateResult;

pub use counter::CounterStore;
pub use entry::Entry;
pub use expiring::ExpiringStore;
pub use reaper::Reaper;
pub use task::PeriodicTask;

/// Key/value capability consumed by outer layers.
pub trait KeyValueStateManager<V>: Send + Sync {
    fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> TtlGateResult<()>;

    fn get(&self, key: &str) -> TtlGateResult<V>;

    /// Remove `key`; `Ok(true)` if a live entry was removed.
    fn delete(&self, key: &str) -> TtlGateResult<bool>;
}

/// Counter capability consumed by the rate limiter.
pub trait CounterStateManager: KeyValueStateManager<i64> {
    fn incr(&self, key: &str) -> TtlGateResult<i64>;

    fn decr(&self, key: &str) -> TtlGateResult<i64>;

    /// Atomically decrement if the counter is positive.
    fn decr_if_positive(&self, key: &str) -> TtlGateResult<Option<i64>>;

    /// Create the counter unless a live one exists.
    fn set_if_absent(&self, key: &str, value: i64, ttl: Option<Duration>) -> TtlGateResult<bool>;
}

impl<V> KeyValueStateManager<V> for ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> TtlGateResult<()> {
        ExpiringStore::set(self, key, value, ttl);
        Ok(())
    }

    fn get(&self, key: &str) -> TtlGateResult<V> {
        ExpiringStore::get(self, key)
    }

    fn delete(&self, key: &str) -> TtlGateResult<bool> {
        Ok(ExpiringStore::delete(self, key))
    }
}

impl KeyValueStateManager<i64> for CounterStore {
    fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> TtlGateResult<()> {
        CounterStore::set(self, key, value, ttl);
        Ok(())
    }

    fn get(&self, key: &str) -> TtlGateResult<i64> {
        CounterStore::get(self, key)
    }

    fn delete(&self, key: &str) -> TtlGateResult<bool> {
        Ok(CounterStore::delete(self, key))
    }
}

impl CounterStateManager for CounterStore {
    fn incr(&self, key: &str) -> TtlGateResult<i64> {
        CounterStore::incr(self, key)
    }

    fn decr(&self, key: &str) -> TtlGateResult<i64> {
        CounterStore::decr(self, key)
    }

    fn decr_if_positive(&self, key: &str) -> TtlGateResult<Option<i64>> {
        CounterStore::decr_if_positive(self, key)
    }

    fn set_if_absent(&self, key: &str, value: i64, ttl: Option<Duration>) -> TtlGateResult<bool> {
        Ok(CounterStore::set_if_absent(self, key, value, ttl))
    }
}
