//! Dynamic configuration coordinator.
//!
//! Populates a config struct from layered sources, persists the merged result and
//! re-applies it when a watched source changes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use hotconf::adaptors::{EnvAdaptor, EnvBinding, EnvField, FileAdaptor, FileWatcher};
//! use hotconf::{with_notifier, with_reader, with_writer, Operator, Shutdown};
//!
//! #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
//! #[serde(default)]
//! struct Config {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl EnvBinding for Config {
//!     const ENV_FIELDS: &'static [EnvField] = &[
//!         EnvField::new("host", "HOST").with_default("0.0.0.0"),
//!         EnvField::new("port", "PORT").with_default("8080"),
//!     ];
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = Arc::new(FileAdaptor::new("/etc/my_app/config.yaml"));
//! let operator = Operator::new(
//!     Config::default(),
//!     [
//!         with_reader(EnvAdaptor::new("MY_APP")),
//!         with_reader(file.clone()),
//!         with_writer(file.clone()),
//!         with_notifier(FileWatcher::new(file.path(), file.clone())),
//!     ],
//! );
//!
//! let shutdown = Shutdown::new();
//! operator.process(&shutdown)?;
//! println!("{:?}", operator.config().load());
//! # Ok(())
//! # }
//! ```

pub mod adaptors;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod operator;
pub mod source;

pub use error::{OperatorError, SourceError};
pub use lifecycle::Shutdown;
pub use operator::{with_notifier, with_reader, with_writer, ConfigOption, LiveConfig, Operator};
pub use source::{ChangeEvent, ChangeHandle, ConfigNotifier, ConfigReader, ConfigWriter};
