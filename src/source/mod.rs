//! Source capabilities composed by the operator.
//!
//! # Capabilities
//! - [`ConfigReader`]: populate a config from one origin
//! - [`ConfigWriter`]: persist the config to one sink
//! - [`ConfigNotifier`]: a reader that also watches its origin and reports changes
//!
//! # Notifier States
//! ```text
//! Unregistered → register() → Idle → watch() → Watching → shutdown → Stopped
//!                                                  │
//!                                  change detected │ ChangeHandle::notify()
//!                                                  ▼
//!                                              Notifying → Watching
//! ```
//!
//! # Design Decisions
//! - Notifiers never hold the operator; they send a [`ChangeEvent`] on the
//!   channel behind their [`ChangeHandle`] and the operator re-reads
//! - Sources are shared through `Arc` so one adaptor can read, write and be watched

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::error::SourceResult;

/// Populates a configuration object from one origin.
pub trait ConfigReader<T>: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Read the origin into `config`, touching only the fields it holds values for.
    fn read(&self, config: &mut T) -> SourceResult<()>;
}

/// Persists a configuration object to one sink.
pub trait ConfigWriter<T>: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Write the whole of `config`, replacing any previous content.
    fn write(&self, config: &T) -> SourceResult<()>;
}

/// A reader that can report when its origin changes.
pub trait ConfigNotifier<T>: ConfigReader<T> {
    /// Bind the notifier to its operator. Called once at wiring time.
    fn register(&self, handle: ChangeHandle);

    /// Begin monitoring in the background and return immediately.
    ///
    /// Implementations may spawn onto the current tokio runtime and report
    /// `WatchStart` when there is none. Monitoring stops once `shutdown` fires. Only a failure to begin is an error;
    /// problems seen while watching are logged.
    fn watch(&self, shutdown: broadcast::Receiver<()>) -> SourceResult<()>;
}

/// A change reported by the notifier at index `notifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub notifier: usize,
}

/// Sending half handed to a notifier at registration.
#[derive(Debug, Clone)]
pub struct ChangeHandle {
    notifier: usize,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChangeHandle {
    pub(crate) fn new(notifier: usize, tx: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        Self { notifier, tx }
    }

    /// Index of the notifier this handle was issued to.
    pub fn notifier(&self) -> usize {
        self.notifier
    }

    /// Report a change. Returns `false` once the operator is gone.
    pub fn notify(&self) -> bool {
        self.tx
            .send(ChangeEvent {
                notifier: self.notifier,
            })
            .is_ok()
    }
}

impl<T, R: ConfigReader<T> + ?Sized> ConfigReader<T> for Arc<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self, config: &mut T) -> SourceResult<()> {
        (**self).read(config)
    }
}

impl<T, W: ConfigWriter<T> + ?Sized> ConfigWriter<T> for Arc<W> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, config: &T) -> SourceResult<()> {
        (**self).write(config)
    }
}

impl<T, N: ConfigNotifier<T> + ?Sized> ConfigNotifier<T> for Arc<N> {
    fn register(&self, handle: ChangeHandle) {
        (**self).register(handle)
    }

    fn watch(&self, shutdown: broadcast::Receiver<()>) -> SourceResult<()> {
        (**self).watch(shutdown)
    }
}
