//! Live configuration cell shared by the operator and its callers.

use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Handle to the configuration owned by an operator.
///
/// Clones are cheap and observe the same value. Reads are lock-free snapshots;
/// mutation goes through the operator, one change at a time.
pub struct LiveConfig<T> {
    inner: Arc<Shared<T>>,
}

struct Shared<T> {
    current: ArcSwap<T>,
    /// Serializes read-modify-write cycles and the writer fan-out that follows.
    mutation: Mutex<()>,
    version: watch::Sender<u64>,
}

impl<T> LiveConfig<T> {
    pub fn new(value: T) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Shared {
                current: ArcSwap::from_pointee(value),
                mutation: Mutex::new(()),
                version,
            }),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<T> {
        self.inner.current.load_full()
    }

    /// Number of committed updates so far.
    pub fn version(&self) -> u64 {
        *self.inner.version.borrow()
    }

    /// Receiver that wakes after every committed update, once the writers that
    /// persist it have run.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// Take the mutation lock. A poisoned lock is recovered; the stored value is
    /// only ever replaced whole, so it cannot be observed half-updated.
    pub(crate) fn lock(&self) -> ConfigGuard<'_, T> {
        let guard = self
            .inner
            .mutation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        ConfigGuard {
            live: self,
            committed: Cell::new(false),
            _guard: guard,
        }
    }
}

impl<T> Clone for LiveConfig<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LiveConfig<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConfig")
            .field("version", &self.version())
            .field("current", &self.load())
            .finish()
    }
}

/// Exclusive access to the live configuration for one update cycle.
///
/// A committed value is visible to `load` at once. Subscribers are woken when
/// the guard is dropped, still under the mutation lock.
pub(crate) struct ConfigGuard<'a, T> {
    live: &'a LiveConfig<T>,
    committed: Cell<bool>,
    _guard: MutexGuard<'a, ()>,
}

impl<T: Clone> ConfigGuard<'_, T> {
    /// Copy of the current value to mutate.
    pub(crate) fn working_copy(&self) -> T {
        T::clone(&self.live.load())
    }
}

impl<T> ConfigGuard<'_, T> {
    pub(crate) fn current(&self) -> Arc<T> {
        self.live.load()
    }

    /// Publish `value`. The version moves when the guard is released.
    pub(crate) fn commit(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.live.inner.current.store(value.clone());
        self.committed.set(true);
        value
    }
}

impl<T> Drop for ConfigGuard<'_, T> {
    fn drop(&mut self) {
        if self.committed.get() {
            self.live.inner.version.send_modify(|version| *version += 1);
        }
    }
}
