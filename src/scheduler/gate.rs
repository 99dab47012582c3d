//! Single-flight gate for pipeline runs.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Non-blocking run lock: at most one [`RunPermit`] exists at a time.
///
/// Clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct RunGate {
    lock: Arc<Mutex<()>>,
}

/// Proof that a run is in progress. The gate reopens when it is dropped,
/// whether the run finished, failed, or panicked.
pub struct RunPermit {
    _guard: OwnedMutexGuard<()>,
}

impl Debug for RunPermit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("RunPermit")
    }
}

impl RunGate {
    /// Open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate if nobody holds it; never waits.
    #[must_use]
    pub fn try_acquire(&self) -> Option<RunPermit> {
        Arc::clone(&self.lock)
            .try_lock_owned()
            .ok()
            .map(|guard| RunPermit { _guard: guard })
    }

    /// Whether a permit is currently held.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
