use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as Slot;
use dashmap::DashMap;
use tracing::{debug, trace};
use ttlgate_common::{TtlGateError, TtlGateResult};

use crate::entry::Entry;
use crate::reaper::Reaper;

pub(crate) type EntryMap<V> = DashMap<String, Entry<V>>;

/// A concurrent map from string keys to values with optional expiry.
///
/// Expired entries are never returned to callers. They are removed lazily
/// when an accessor runs into one, and actively by the optional [`Reaper`].
///
/// Reads take the key's shard in shared mode. Any mutation, including the
/// eviction a read performs when it finds an expired entry, takes the shard
/// exclusively and re-checks the entry before changing it.
///
/// The store is cheaply cloneable (backed by `Arc`); clones share the same
/// entries and the same reaper. The reaper stops when the last clone is
/// dropped or when [`shutdown`](ExpiringStore::shutdown) is awaited.
pub struct ExpiringStore<V> {
    entries: Arc<EntryMap<V>>,
    reaper: Option<Arc<Reaper>>,
}

impl<V> Clone for ExpiringStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            reaper: self.reaper.clone(),
        }
    }
}

impl<V> Default for ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store that only evicts lazily.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            reaper: None,
        }
    }

    /// Create a store with a background reaper sweeping every `sweep_interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_reaper(sweep_interval: Duration) -> TtlGateResult<Self> {
        let entries = Arc::new(DashMap::new());
        let reaper = Reaper::spawn(Arc::downgrade(&entries), sweep_interval)?;
        Ok(Self {
            entries,
            reaper: Some(Arc::new(reaper)),
        })
    }

    /// Insert or replace `key`. A `None` or zero `ttl` means no expiry.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        self.entries.insert(key.to_string(), Entry::new(value, ttl));
    }

    /// Fetch the live value for `key`.
    ///
    /// Returns [`TtlGateError::Expired`] the first time an expired entry is
    /// seen (and evicts it), and [`TtlGateError::NotFound`] for keys that were
    /// never set or have already been removed.
    pub fn get(&self, key: &str) -> TtlGateResult<V> {
        let now = Instant::now();

        {
            let Some(entry) = self.entries.get(key) else {
                return Err(TtlGateError::NotFound(key.to_string()));
            };
            if !entry.is_expired_at(now) {
                return Ok(entry.value.clone());
            }
            // Shared guard must be released before taking the shard exclusively.
        }

        // Re-check under exclusive access: another caller may already have
        // evicted or overwritten the entry.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(Instant::now()))
            .is_some()
        {
            trace!(key, "lazily evicted expired entry");
        }

        Err(TtlGateError::Expired(key.to_string()))
    }

    /// Remove `key`. Returns `true` if a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired())
    }

    /// Remove `key` if it is live and `accept` approves its value.
    ///
    /// The check and the removal happen under one exclusive lock, so at most
    /// one caller can consume a given value.
    pub fn consume_if<F>(&self, key: &str, accept: F) -> TtlGateResult<bool>
    where
        F: FnOnce(&V) -> bool,
    {
        match self.entries.entry(key.to_string()) {
            Slot::Occupied(occupied) => {
                if occupied.get().is_expired_at(Instant::now()) {
                    occupied.remove();
                    return Err(TtlGateError::Expired(key.to_string()));
                }
                if accept(&occupied.get().value) {
                    occupied.remove();
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Slot::Vacant(_) => Err(TtlGateError::NotFound(key.to_string())),
        }
    }

    /// Apply `f` to the live value for `key` under exclusive access.
    ///
    /// The expiry is left untouched. Missing keys fail with `NotFound`;
    /// expired keys are evicted and fail with `Expired`. Nothing is created.
    pub fn update<R, F>(&self, key: &str, f: F) -> TtlGateResult<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        match self.entries.entry(key.to_string()) {
            Slot::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(Instant::now()) {
                    occupied.remove();
                    return Err(TtlGateError::Expired(key.to_string()));
                }
                Ok(f(&mut occupied.get_mut().value))
            }
            Slot::Vacant(_) => Err(TtlGateError::NotFound(key.to_string())),
        }
    }

    /// Insert `key` unless a live entry already holds it.
    ///
    /// An expired entry is replaced. Returns `true` if a value was written.
    pub fn set_if_absent(&self, key: &str, value: V, ttl: Option<Duration>) -> bool {
        match self.entries.entry(key.to_string()) {
            Slot::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(Instant::now()) {
                    occupied.insert(Entry::new(value, ttl));
                    true
                } else {
                    false
                }
            }
            Slot::Vacant(vacant) => {
                vacant.insert(Entry::new(value, ttl));
                true
            }
        }
    }

    /// Evict every expired entry now. Returns the number evicted.
    pub fn sweep_expired(&self) -> usize {
        let evicted = sweep(&self.entries, Instant::now());
        debug!(evicted, remaining = self.entries.len(), "store sweep complete");
        evicted
    }

    /// Number of physically resident entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this store runs a background reaper.
    pub fn has_reaper(&self) -> bool {
        self.reaper.is_some()
    }

    /// Stop the background reaper, if any, and wait for it to exit.
    pub async fn shutdown(&self) {
        if let Some(reaper) = &self.reaper {
            reaper.shutdown().await;
        }
    }

    pub(crate) fn entries(&self) -> &EntryMap<V> {
        &self.entries
    }
}

/// Remove every entry expired as of `now`, holding each shard exclusively
/// while it is scanned.
pub(crate) fn sweep<V>(entries: &EntryMap<V>, now: Instant) -> usize {
    let mut evicted = 0;
    entries.retain(|_, entry| {
        let live = !entry.is_expired_at(now);
        if !live {
            evicted += 1;
        }
        live
    });
    evicted
}
