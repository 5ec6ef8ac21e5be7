//! Error types for sources and the operator.
//!
//! # Taxonomy
//! ```text
//! SourceError (raised by a single reader, writer or notifier)
//!     Unavailable  origin missing or unreadable
//!     Malformed    origin readable but cannot be decoded onto the config
//!     SinkWrite    config cannot be persisted
//!     WatchStart   monitoring could not begin
//!
//! OperatorError (raised by Operator::process, wraps the phase that failed)
//!     Read / Write / Notifier / AlreadyStarted
//! ```
//!
//! Errors raised while handling a change notification never reach a caller;
//! the operator logs them and keeps watching.

use std::io;
use thiserror::Error;

/// Errors raised by a configuration source or sink.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The origin exists but could not be read.
    #[error("cannot read {origin}: {cause}")]
    Unavailable {
        origin: String,
        #[source]
        cause: io::Error,
    },

    /// The origin was read but its content does not fit the config.
    #[error("malformed config from {origin}: {reason}")]
    Malformed { origin: String, reason: String },

    /// The config could not be persisted.
    #[error("cannot write config to {origin}: {reason}")]
    SinkWrite { origin: String, reason: String },

    /// Monitoring of the origin could not begin.
    #[error("cannot watch {origin}: {reason}")]
    WatchStart { origin: String, reason: String },
}

impl SourceError {
    pub fn unavailable(origin: impl Into<String>, cause: io::Error) -> Self {
        Self::Unavailable {
            origin: origin.into(),
            cause,
        }
    }

    pub fn malformed(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink_write(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::SinkWrite {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub fn watch_start(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::WatchStart {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors returned by [`Operator::process`](crate::Operator::process).
#[derive(Debug, Error)]
pub enum OperatorError {
    /// A reader failed; later readers were not attempted.
    #[error("config read failed: {0}")]
    Read(#[source] SourceError),

    /// A writer failed; no notifier was started.
    #[error("config write failed: {0}")]
    Write(#[source] SourceError),

    /// A notifier could not begin watching. Notifiers started before it keep running.
    #[error("failed to start notifier: {0}")]
    Notifier(#[source] SourceError),

    /// `process` runs once per operator.
    #[error("operator has already been processed")]
    AlreadyStarted,
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
