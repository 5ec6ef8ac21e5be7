//! Construction options for the operator.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::source::{ChangeEvent, ChangeHandle, ConfigNotifier, ConfigReader, ConfigWriter};

/// Ordered source lists an operator coordinates. Append-only.
pub struct Sources<T> {
    pub(crate) readers: Vec<Box<dyn ConfigReader<T>>>,
    pub(crate) writers: Vec<Box<dyn ConfigWriter<T>>>,
    pub(crate) notifiers: Vec<Arc<dyn ConfigNotifier<T>>>,
    changes: mpsc::UnboundedSender<ChangeEvent>,
}

impl<T> Sources<T> {
    pub(crate) fn new(changes: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
            notifiers: Vec::new(),
            changes,
        }
    }

    pub fn readers(&self) -> usize {
        self.readers.len()
    }

    pub fn writers(&self) -> usize {
        self.writers.len()
    }

    pub fn notifiers(&self) -> usize {
        self.notifiers.len()
    }

    pub fn add_reader(&mut self, reader: impl ConfigReader<T> + 'static)
    where
        T: 'static,
    {
        self.readers.push(Box::new(reader));
    }

    pub fn add_writer(&mut self, writer: impl ConfigWriter<T> + 'static)
    where
        T: 'static,
    {
        self.writers.push(Box::new(writer));
    }

    /// Register `notifier` under the next index and append it.
    pub fn add_notifier(&mut self, notifier: impl ConfigNotifier<T> + 'static)
    where
        T: 'static,
    {
        let handle = ChangeHandle::new(self.notifiers.len(), self.changes.clone());
        notifier.register(handle);
        self.notifiers.push(Arc::new(notifier));
    }
}

/// A step applied to an operator's sources at construction.
pub struct ConfigOption<T>(Box<dyn FnOnce(&mut Sources<T>) + Send>);

impl<T> ConfigOption<T> {
    /// Wrap an arbitrary mutation of the source lists.
    pub fn new(apply: impl FnOnce(&mut Sources<T>) + Send + 'static) -> Self {
        Self(Box::new(apply))
    }

    pub(crate) fn apply(self, sources: &mut Sources<T>) {
        (self.0)(sources)
    }
}

/// Append a reader. Readers run in the order they are added.
pub fn with_reader<T, R>(reader: R) -> ConfigOption<T>
where
    T: 'static,
    R: ConfigReader<T> + 'static,
{
    ConfigOption::new(move |sources: &mut Sources<T>| sources.add_reader(reader))
}

/// Append a writer. Every writer runs on every update.
pub fn with_writer<T, W>(writer: W) -> ConfigOption<T>
where
    T: 'static,
    W: ConfigWriter<T> + 'static,
{
    ConfigOption::new(move |sources: &mut Sources<T>| sources.add_writer(writer))
}

/// Append a notifier and register it with the operator's change channel.
pub fn with_notifier<T, N>(notifier: N) -> ConfigOption<T>
where
    T: 'static,
    N: ConfigNotifier<T> + 'static,
{
    ConfigOption::new(move |sources: &mut Sources<T>| sources.add_notifier(notifier))
}
