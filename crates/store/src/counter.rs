use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as Slot;
use ttlgate_common::TtlGateResult;

use crate::entry::Entry;
use crate::expiring::ExpiringStore;

/// An [`ExpiringStore`] of `i64` counters with atomic increment/decrement.
///
/// `incr` creates missing or expired counters at `1`; `decr` never creates
/// and reports `NotFound`/`Expired` instead. Callers that want a gated
/// counter initialise it with [`set`](CounterStore::set) first.
#[derive(Clone, Default)]
pub struct CounterStore {
    inner: ExpiringStore<i64>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self {
            inner: ExpiringStore::new(),
        }
    }

    /// Create a counter store with a background reaper.
    pub fn with_reaper(sweep_interval: Duration) -> TtlGateResult<Self> {
        Ok(Self {
            inner: ExpiringStore::with_reaper(sweep_interval)?,
        })
    }

    pub fn get(&self, key: &str) -> TtlGateResult<i64> {
        self.inner.get(key)
    }

    pub fn set(&self, key: &str, value: i64, ttl: Option<Duration>) {
        self.inner.set(key, value, ttl);
    }

    pub fn set_if_absent(&self, key: &str, value: i64, ttl: Option<Duration>) -> bool {
        self.inner.set_if_absent(key, value, ttl)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.delete(key)
    }

    /// Add one to `key` and return the new value.
    ///
    /// A missing or expired counter is replaced by a fresh one holding `1`
    /// with no expiry. A live counter keeps its expiry.
    pub fn incr(&self, key: &str) -> TtlGateResult<i64> {
        let next = match self.inner.entries().entry(key.to_string()) {
            Slot::Occupied(mut occupied) => {
                let current = occupied.get();
                let next = if current.is_expired_at(Instant::now()) {
                    Entry::new(1, None)
                } else {
                    Entry {
                        value: current.value.saturating_add(1),
                        expiry: current.expiry,
                    }
                };
                let value = next.value;
                occupied.insert(next);
                value
            }
            Slot::Vacant(vacant) => {
                vacant.insert(Entry::new(1, None));
                1
            }
        };
        Ok(next)
    }

    /// Subtract one from an existing counter and return the new value.
    ///
    /// The result may go negative; what a non-positive value means is up to
    /// the caller.
    pub fn decr(&self, key: &str) -> TtlGateResult<i64> {
        self.inner.update(key, |value| {
            *value = value.saturating_sub(1);
            *value
        })
    }

    /// Subtract one only if the counter is positive.
    ///
    /// Returns `Ok(Some(new))` when decremented and `Ok(None)` when the
    /// counter was already `<= 0` and left untouched. The check and the
    /// decrement happen under one exclusive lock.
    pub fn decr_if_positive(&self, key: &str) -> TtlGateResult<Option<i64>> {
        self.inner.update(key, |value| {
            if *value > 0 {
                *value -= 1;
                Some(*value)
            } else {
                None
            }
        })
    }

    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub async fn shutdown(&self) {
        self.inner.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use ttlgate_common::TtlGateError;

    const SHORT: Duration = Duration::from_millis(30);

    #[test]
    fn incr_creates_then_counts() {
        let store = CounterStore::new();
        assert_eq!(store.incr("fresh").unwrap(), 1);
        assert_eq!(store.incr("fresh").unwrap(), 2);
        assert_eq!(store.get("fresh").unwrap(), 2);
    }

    #[test]
    fn incr_restarts_expired_counter_without_ttl() {
        let store = CounterStore::new();
        store.set("k", 41, Some(SHORT));
        thread::sleep(SHORT * 2);

        assert_eq!(store.incr("k").unwrap(), 1);
        thread::sleep(SHORT * 2);
        assert_eq!(store.get("k").unwrap(), 1);
    }

    #[test]
    fn incr_preserves_live_expiry() {
        let store = CounterStore::new();
        store.set("k", 5, Some(SHORT));
        assert_eq!(store.incr("k").unwrap(), 6);
        thread::sleep(SHORT * 2);
        assert!(matches!(store.get("k"), Err(TtlGateError::Expired(_))));
    }

    #[test]
    fn decr_requires_existing_key() {
        let store = CounterStore::new();
        assert!(matches!(store.decr("never"), Err(TtlGateError::NotFound(_))));
        assert!(store.is_empty());
        assert!(matches!(store.get("never"), Err(TtlGateError::NotFound(_))));
    }

    #[test]
    fn decr_evicts_expired_key() {
        let store = CounterStore::new();
        store.set("k", 3, Some(SHORT));
        thread::sleep(SHORT * 2);

        assert!(matches!(store.decr("k"), Err(TtlGateError::Expired(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn decr_may_go_negative() {
        let store = CounterStore::new();
        store.set("k", 1, None);
        assert_eq!(store.decr("k").unwrap(), 0);
        assert_eq!(store.decr("k").unwrap(), -1);
    }

    #[test]
    fn decr_if_positive_stops_at_zero() {
        let store = CounterStore::new();
        store.set("k", 2, None);
        assert_eq!(store.decr_if_positive("k").unwrap(), Some(1));
        assert_eq!(store.decr_if_positive("k").unwrap(), Some(0));
        assert_eq!(store.decr_if_positive("k").unwrap(), None);
        assert_eq!(store.get("k").unwrap(), 0);
    }

    #[test]
    fn concurrent_incr_loses_no_updates() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let store = Arc::new(CounterStore::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        store.incr("shared").unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("shared").unwrap(), (THREADS * PER_THREAD) as i64);
    }

    #[test]
    fn concurrent_decr_if_positive_never_over_admits() {
        const THREADS: usize = 16;
        const CAPACITY: i64 = 100;

        let store = CounterStore::new();
        store.set("bucket", CAPACITY, None);

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..50)
                        .filter(|_| matches!(store.decr_if_positive("bucket"), Ok(Some(_))))
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted as i64, CAPACITY);
        assert_eq!(store.get("bucket").unwrap(), 0);
    }
}
