//! Configuration operator.
//!
//! # Data Flow
//! ```text
//! Operator::process
//!     → every reader, in order, onto a working copy
//!     → commit to LiveConfig
//!     → every writer, in order
//!     → every notifier's watch() (non-blocking)
//!     → dispatch loop spawned
//!
//! On change:
//!     notifier → ChangeHandle::notify() → ChangeEvent on the channel
//!     → dispatch loop → Operator::config_changed(notifier)
//!     → re-read from that notifier only → every writer → log snapshot
//! ```
//!
//! # Design Decisions
//! - One mutation at a time: reads, commit and writer fan-out share one lock
//! - Callers see lock-free `Arc<T>` snapshots through `LiveConfig`
//! - Startup errors are fatal; errors while handling changes are logged

pub mod core;
pub mod options;
pub mod state;

pub use self::core::Operator;
pub use options::{with_notifier, with_reader, with_writer, ConfigOption, Sources};
pub use state::LiveConfig;
