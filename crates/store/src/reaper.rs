use std::sync::Weak;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use ttlgate_common::{TtlGateError, TtlGateResult};

use crate::expiring::{sweep, EntryMap};
use crate::task::PeriodicTask;

/// Background sweeper that evicts expired entries from one store.
///
/// Lazy eviction only fires on reads, so keys written once and never read
/// again would otherwise stay resident forever. The reaper holds a weak
/// reference to the map and exits on its own once the store is gone.
pub struct Reaper {
    task: PeriodicTask,
}

impl Reaper {
    pub(crate) fn spawn<V>(entries: Weak<EntryMap<V>>, period: Duration) -> TtlGateResult<Self>
    where
        V: Send + Sync + 'static,
    {
        let task = PeriodicTask::spawn("store-reaper", period, move || {
            let entries = entries.upgrade().ok_or(TtlGateError::Closed)?;
            let evicted = sweep(&entries, Instant::now());

            if evicted > 0 {
                debug!(evicted, remaining = entries.len(), "reaper sweep complete");
            } else {
                trace!(remaining = entries.len(), "reaper sweep found nothing to evict");
            }
            Ok(())
        })?;

        Ok(Self { task })
    }

    pub fn period(&self) -> Duration {
        self.task.period()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    pub async fn shutdown(&self) {
        self.task.shutdown().await;
    }
}
