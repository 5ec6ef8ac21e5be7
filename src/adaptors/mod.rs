//! Source adaptors.
//!
//! # Data Flow
//! ```text
//! environment (PREFIX_TAG)   → env.rs     (reader)
//! config file (YAML/TOML)    → file.rs    (reader + writer)
//! file writes (notify)       → watcher.rs (notifier, reads through a wrapped reader)
//!
//! env.rs and file.rs decode into a value tree and overlay it onto the
//! config through merge.rs, so fields a source does not mention are kept.
//! ```

pub mod env;
pub mod file;
pub mod merge;
pub mod watcher;

pub use env::{EnvAdaptor, EnvBinding, EnvField};
pub use file::{FileAdaptor, FileFormat};
pub use watcher::FileWatcher;
