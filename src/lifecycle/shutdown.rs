//! Shutdown coordination for background watchers.

use tokio::sync::broadcast;

/// Coordinator for stopping notifiers and the operator's dispatch loop.
///
/// Provides a broadcast channel that all long-running tasks subscribe to.
/// Dropping every clone stops subscribers the same way a trigger does.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let listeners = self.tx.send(()).unwrap_or(0);
        tracing::debug!(listeners, "Shutdown triggered");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
