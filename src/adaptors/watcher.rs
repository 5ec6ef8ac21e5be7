//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::error::{SourceError, SourceResult};
use crate::source::{ChangeHandle, ConfigNotifier, ConfigReader};

/// Quiet period after a write before the change is reported.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// A notifier that monitors one file for writes.
///
/// Reads are delegated to the wrapped reader, usually a
/// [`FileAdaptor`](crate::adaptors::FileAdaptor) on the same path.
pub struct FileWatcher<R> {
    path: PathBuf,
    name: String,
    reader: R,
    debounce: Duration,
    handle: OnceLock<ChangeHandle>,
}

impl<R> FileWatcher<R> {
    /// Create a new FileWatcher for `path`.
    pub fn new(path: impl AsRef<Path>, reader: R) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("watch:{}", path.display()),
            path,
            reader,
            debounce: DEFAULT_DEBOUNCE,
            handle: OnceLock::new(),
        }
    }

    /// Coalesce writes that land within `debounce` of each other.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether `event` reports new content written to the file.
fn is_write(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

impl<T, R: ConfigReader<T>> ConfigReader<T> for FileWatcher<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, config: &mut T) -> SourceResult<()> {
        self.reader.read(config)
    }
}

impl<T, R: ConfigReader<T>> ConfigNotifier<T> for FileWatcher<R> {
    fn register(&self, handle: ChangeHandle) {
        if self.handle.set(handle).is_err() {
            tracing::warn!(path = ?self.path, "File watcher registered twice, keeping the first operator");
        }
    }

    /// Start watching the file. The notify backend runs on its own thread; a tokio
    /// task debounces its events and holds the watcher until shutdown, so this
    /// must be called inside a tokio runtime.
    fn watch(&self, mut shutdown: broadcast::Receiver<()>) -> SourceResult<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SourceError::watch_start(&self.name, "no tokio runtime available"));
        }

        let handle = self
            .handle
            .get()
            .cloned()
            .ok_or_else(|| SourceError::watch_start(&self.name, "notifier is not registered"))?;

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<()>();
        let event_path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_write(&event) {
                        tracing::debug!(path = ?event_path, "Config file change detected");
                        let _ = raw_tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )
        .map_err(|e| SourceError::watch_start(&self.name, e))?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| SourceError::watch_start(&self.name, e))?;

        tracing::info!(path = ?self.path, "Config watcher started");

        let path = self.path.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            let _watcher = watcher;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    received = raw_rx.recv() => {
                        if received.is_none() {
                            break;
                        }
                        tokio::time::sleep(debounce).await;
                        while raw_rx.try_recv().is_ok() {}
                        if !handle.notify() {
                            tracing::debug!(path = ?path, "Operator gone");
                            break;
                        }
                    }
                }
            }
            tracing::info!(path = ?path, "Config watcher stopped");
        });

        Ok(())
    }
}
