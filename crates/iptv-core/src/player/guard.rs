use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

/// Single-flight switch guard.
///
/// Each acquisition starts a new epoch; work carrying an older epoch is stale
/// and must abandon. A lease is force-released after a timeout so an engine
/// that never signals cannot block selection forever.
#[derive(Debug, Default)]
pub(crate) struct SwitchGuard {
    epoch: AtomicU64,
    lease: Mutex<Option<Lease>>,
}

#[derive(Debug)]
struct Lease {
    epoch: u64,
    release_timer: JoinHandle<()>,
}

impl SwitchGuard {
    /// Takes the guard for a new epoch, or `None` while a load is in flight.
    /// Must be called within a Tokio runtime.
    pub(crate) fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<u64> {
        let mut lease = self.lock();
        if lease.is_some() {
            return None;
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *lease = Some(self.lease_for(epoch, timeout));
        Some(epoch)
    }

    /// Re-takes the guard for an epoch that is still current, for recovery
    /// after a post-load failure. Fails if anything newer started.
    pub(crate) fn resume(self: &Arc<Self>, epoch: u64, timeout: Duration) -> bool {
        let mut lease = self.lock();
        if lease.is_some() || !self.is_current(epoch) {
            return false;
        }
        *lease = Some(self.lease_for(epoch, timeout));
        true
    }

    /// Releases the lease if `epoch` still holds it.
    pub(crate) fn release(&self, epoch: u64) -> bool {
        let mut lease = self.lock();
        match lease.as_ref() {
            Some(held) if held.epoch == epoch => {
                if let Some(held) = lease.take() {
                    held.release_timer.abort();
                }
                true
            }
            _ => false,
        }
    }

    /// Makes every outstanding epoch stale and drops the lease.
    pub(crate) fn invalidate(&self) {
        let mut lease = self.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(held) = lease.take() {
            held.release_timer.abort();
        }
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    pub(crate) fn is_held(&self) -> bool {
        self.lock().is_some()
    }

    fn lease_for(self: &Arc<Self>, epoch: u64, timeout: Duration) -> Lease {
        let guard = Arc::downgrade(self);
        let release_timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(guard) = guard.upgrade() {
                if guard.release(epoch) {
                    warn!(epoch, timeout_ms = timeout.as_millis() as u64, "Switch guard force-released");
                }
            }
        });
        Lease {
            epoch,
            release_timer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Lease>> {
        self.lease.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
