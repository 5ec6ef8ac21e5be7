//! The operator: initial population, persistence and change-driven reloads.

use std::sync::{Arc, Mutex, PoisonError};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::error::{OperatorError, SourceError, SourceResult};
use crate::lifecycle::Shutdown;
use crate::operator::options::{ConfigOption, Sources};
use crate::operator::state::LiveConfig;
use crate::source::{ChangeEvent, ConfigReader};

/// Coordinates readers, writers and notifiers around one configuration object.
///
/// Cloning yields another handle to the same operator.
pub struct Operator<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    config: LiveConfig<T>,
    sources: Sources<T>,
    /// Taken by the first `process` call.
    events: Mutex<Option<mpsc::UnboundedReceiver<ChangeEvent>>>,
}

impl<T> Clone for Operator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Operator<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create an operator around `config`, applying `options` in order.
    pub fn new(config: T, options: impl IntoIterator<Item = ConfigOption<T>>) -> Self {
        let (changes, events) = mpsc::unbounded_channel();
        let mut sources = Sources::new(changes);
        for option in options {
            option.apply(&mut sources);
        }

        tracing::debug!(
            readers = sources.readers(),
            writers = sources.writers(),
            notifiers = sources.notifiers(),
            "Operator created"
        );

        Self {
            inner: Arc::new(Inner {
                config: LiveConfig::new(config),
                sources,
                events: Mutex::new(Some(events)),
            }),
        }
    }

    /// Handle to the live configuration.
    pub fn config(&self) -> LiveConfig<T> {
        self.inner.config.clone()
    }

    /// Registered source lists.
    pub fn sources(&self) -> &Sources<T> {
        &self.inner.sources
    }

    /// Populate the config from every reader, persist it through every writer,
    /// then start every notifier.
    ///
    /// Each phase fails fast and earlier phases are not rolled back. A reader
    /// failure leaves the live config untouched. When notifiers are registered
    /// this must run inside a tokio runtime; change handling continues in the
    /// background until `shutdown` fires.
    pub fn process(&self, shutdown: &Shutdown) -> Result<(), OperatorError> {
        let events = self
            .inner
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(OperatorError::AlreadyStarted)?;

        let current = {
            let guard = self.inner.config.lock();
            let mut working = guard.working_copy();
            for reader in &self.inner.sources.readers {
                reader.read(&mut working).map_err(OperatorError::Read)?;
                tracing::debug!(source = reader.name(), "Config source read");
            }
            let current = guard.commit(working);
            self.write_all(&current).map_err(OperatorError::Write)?;
            current
        };

        let notifiers = &self.inner.sources.notifiers;
        if !notifiers.is_empty() {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(OperatorError::Notifier(SourceError::watch_start(
                    notifiers[0].name(),
                    "no tokio runtime available",
                )));
            }
            // Running before any watch starts, so notifiers that started ahead of
            // a failing one still get their changes applied.
            tokio::spawn(self.clone().dispatch_loop(events, shutdown.subscribe()));
            for notifier in notifiers {
                notifier
                    .watch(shutdown.subscribe())
                    .map_err(OperatorError::Notifier)?;
                tracing::debug!(source = notifier.name(), "Notifier started");
            }
        }

        tracing::info!(config = %snapshot(&*current), "Configuration loaded");
        Ok(())
    }

    /// Re-read from `reader` alone, then re-run every writer.
    ///
    /// Failures are logged, never returned: a failed read keeps the previous
    /// value and the writers still run. Subscribers of the live config wake only
    /// after the writers are done.
    pub fn config_changed<R>(&self, reader: &R)
    where
        R: ConfigReader<T> + ?Sized,
    {
        let guard = self.inner.config.lock();
        let mut working = guard.working_copy();
        let current = match reader.read(&mut working) {
            Ok(()) => guard.commit(working),
            Err(e) => {
                tracing::error!(source = reader.name(), error = %e, "Failed to read config");
                guard.current()
            }
        };

        if let Err(e) = self.write_all(&current) {
            tracing::error!(error = %e, "Failed to write config");
        }
        drop(guard);

        tracing::info!(
            source = reader.name(),
            version = self.inner.config.version(),
            config = %snapshot(&*current),
            "Config changed"
        );
    }

    /// Route a change event to the notifier that raised it.
    pub fn dispatch(&self, event: ChangeEvent) {
        match self.inner.sources.notifiers.get(event.notifier) {
            Some(notifier) => self.config_changed(&**notifier),
            None => tracing::warn!(notifier = event.notifier, "Change from unknown notifier ignored"),
        }
    }

    fn write_all(&self, config: &T) -> SourceResult<()> {
        for writer in &self.inner.sources.writers {
            writer.write(config)?;
            tracing::debug!(sink = writer.name(), "Config written");
        }
        Ok(())
    }

    async fn dispatch_loop(
        self,
        mut events: mpsc::UnboundedReceiver<ChangeEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let operator = self.clone();
                    // Readers and writers do blocking I/O.
                    if let Err(e) = tokio::task::spawn_blocking(move || operator.dispatch(event)).await {
                        tracing::error!(error = %e, "Change handler panicked");
                    }
                }
            }
        }
        tracing::debug!("Change dispatch stopped");
    }
}

/// JSON rendering of the config for log records.
fn snapshot<T: Serialize>(config: &T) -> String {
    serde_json::to_string(config).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{with_notifier, with_reader, with_writer};
    use crate::source::{ChangeHandle, ConfigNotifier, ConfigWriter};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        host: String,
        port: u16,
    }

    struct SetHost(&'static str);

    impl ConfigReader<TestConfig> for SetHost {
        fn read(&self, config: &mut TestConfig) -> SourceResult<()> {
            config.host = self.0.to_string();
            Ok(())
        }
    }

    struct Failing;

    impl ConfigReader<TestConfig> for Failing {
        fn read(&self, _: &mut TestConfig) -> SourceResult<()> {
            Err(SourceError::malformed("failing", "bad document"))
        }
    }

    impl ConfigWriter<TestConfig> for Failing {
        fn write(&self, _: &TestConfig) -> SourceResult<()> {
            Err(SourceError::sink_write("failing", "read-only"))
        }
    }

    impl ConfigNotifier<TestConfig> for Failing {
        fn register(&self, _: ChangeHandle) {}

        fn watch(&self, _: broadcast::Receiver<()>) -> SourceResult<()> {
            Err(SourceError::watch_start("failing", "resource missing"))
        }
    }

    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<TestConfig>>,
    }

    impl ConfigWriter<TestConfig> for Recorder {
        fn write(&self, config: &TestConfig) -> SourceResult<()> {
            self.writes.lock().unwrap().push(config.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        handle: OnceLock<ChangeHandle>,
        watches: AtomicUsize,
    }

    impl ConfigReader<TestConfig> for CountingNotifier {
        fn read(&self, config: &mut TestConfig) -> SourceResult<()> {
            config.host = "changed".into();
            Ok(())
        }
    }

    impl ConfigNotifier<TestConfig> for CountingNotifier {
        fn register(&self, handle: ChangeHandle) {
            let _ = self.handle.set(handle);
        }

        fn watch(&self, _: broadcast::Receiver<()>) -> SourceResult<()> {
            self.watches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_readers_apply_in_order() {
        let operator = Operator::new(
            TestConfig::default(),
            [with_reader(SetHost("first")), with_reader(SetHost("second"))],
        );
        operator.process(&Shutdown::new()).unwrap();

        assert_eq!(operator.config().load().host, "second");
        assert_eq!(operator.config().version(), 1);
    }

    #[test]
    fn test_read_failure_stops_processing() {
        let recorder = Arc::new(Recorder::default());
        let operator = Operator::new(
            TestConfig::default(),
            [
                with_reader(Failing),
                with_reader(SetHost("unreached")),
                with_writer(recorder.clone()),
            ],
        );

        let err = operator.process(&Shutdown::new()).unwrap_err();
        assert!(matches!(err, OperatorError::Read(_)));
        assert!(err.to_string().starts_with("config read failed"));
        assert_eq!(*operator.config().load(), TestConfig::default());
        assert!(recorder.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_process_runs_once() {
        let operator = Operator::new(TestConfig::default(), Vec::<ConfigOption<TestConfig>>::new());
        let shutdown = Shutdown::new();
        operator.process(&shutdown).unwrap();
        assert!(matches!(
            operator.process(&shutdown),
            Err(OperatorError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_notifier_registered_at_construction() {
        let notifier = Arc::new(CountingNotifier::default());
        let _operator = Operator::new(TestConfig::default(), [with_notifier(notifier.clone())]);

        assert_eq!(notifier.handle.get().map(ChangeHandle::notifier), Some(0));
        assert_eq!(notifier.watches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_process_without_runtime_rejects_notifiers() {
        let notifier = Arc::new(CountingNotifier::default());
        let operator = Operator::new(TestConfig::default(), [with_notifier(notifier.clone())]);

        let err = operator.process(&Shutdown::new()).unwrap_err();
        assert!(matches!(err, OperatorError::Notifier(SourceError::WatchStart { .. })));
        assert_eq!(notifier.watches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_config_changed_keeps_value_on_read_failure() {
        let recorder = Arc::new(Recorder::default());
        let operator = Operator::new(
            TestConfig {
                host: "kept".into(),
                port: 80,
            },
            [with_writer(recorder.clone())],
        );

        operator.config_changed(&Failing);

        assert_eq!(operator.config().load().host, "kept");
        assert_eq!(operator.config().version(), 0);
        // Writers still run after a failed re-read.
        assert_eq!(recorder.writes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dispatch_routes_to_notifier() {
        let notifier = Arc::new(CountingNotifier::default());
        let operator = Operator::new(TestConfig::default(), [with_notifier(notifier)]);

        operator.dispatch(ChangeEvent { notifier: 0 });
        assert_eq!(operator.config().load().host, "changed");

        operator.dispatch(ChangeEvent { notifier: 9 });
        assert_eq!(operator.config().version(), 1);
    }

    #[tokio::test]
    async fn test_change_event_reaches_operator() {
        let notifier = Arc::new(CountingNotifier::default());
        let recorder = Arc::new(Recorder::default());
        let operator = Operator::new(
            TestConfig::default(),
            [with_notifier(notifier.clone()), with_writer(recorder.clone())],
        );
        let shutdown = Shutdown::new();

        operator.process(&shutdown).unwrap();
        assert_eq!(notifier.watches.load(Ordering::SeqCst), 1);

        let mut changes = operator.config().subscribe();
        assert!(notifier.handle.get().unwrap().notify());
        tokio::time::timeout(std::time::Duration::from_secs(5), changes.changed())
            .await
            .expect("change applied in time")
            .unwrap();

        assert_eq!(operator.config().load().host, "changed");
        // Subscribers wake only once the change is persisted.
        let writes = recorder.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].host, "changed");
        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_started_notifier_survives_later_failure() {
        let started = Arc::new(CountingNotifier::default());
        let operator = Operator::new(
            TestConfig::default(),
            [with_notifier(started.clone()), with_notifier(Failing)],
        );
        let shutdown = Shutdown::new();

        let err = operator.process(&shutdown).unwrap_err();
        assert!(matches!(err, OperatorError::Notifier(_)));
        assert_eq!(started.watches.load(Ordering::SeqCst), 1);

        let mut changes = operator.config().subscribe();
        assert!(started.handle.get().unwrap().notify());
        tokio::time::timeout(std::time::Duration::from_secs(5), changes.changed())
            .await
            .expect("change applied in time")
            .unwrap();

        assert_eq!(operator.config().load().host, "changed");
        shutdown.trigger();
    }
}
