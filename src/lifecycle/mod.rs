//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Operator::process → notifiers and dispatch loop subscribe to Shutdown
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → Shutdown::trigger → watchers and dispatch stop
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
