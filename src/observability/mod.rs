//! Observability.
//!
//! All subsystems emit `tracing` events with structured fields; the operator
//! logs a JSON snapshot of the config after every change.

pub mod logging;

pub use logging::init_logging;
