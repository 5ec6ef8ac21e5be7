//! hotconf daemon.
//!
//! Loads a service config from the environment and a file, keeps the file in sync
//! and logs every change until interrupted.
//!
//! ```text
//! HOTCONF_PORT=5050 hotconf --file service.yaml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use serde::{Deserialize, Serialize};

use hotconf::adaptors::{EnvAdaptor, EnvBinding, EnvField, FileAdaptor, FileFormat, FileWatcher};
use hotconf::lifecycle::signals::shutdown_signal;
use hotconf::observability::init_logging;
use hotconf::{with_notifier, with_reader, with_writer, Operator, Shutdown};

#[derive(Parser)]
#[command(name = "hotconf")]
#[command(about = "Keep a service config in sync with its environment and file", long_about = None)]
struct Cli {
    /// Config file to read, persist and watch.
    #[arg(short, long, default_value = "hotconf.yaml")]
    file: PathBuf,

    /// Environment variable prefix.
    #[arg(short, long, default_value = "HOTCONF")]
    prefix: String,

    /// Force the file format instead of guessing from the extension.
    #[arg(long, value_parser = ["yaml", "toml"])]
    format: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

/// Config managed by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ServiceConfig {
    host: String,
    port: u16,
    log_level: String,
}

impl EnvBinding for ServiceConfig {
    const ENV_FIELDS: &'static [EnvField] = &[
        EnvField::new("host", "HOST").with_default("0.0.0.0"),
        EnvField::new("port", "PORT").with_default("8080"),
        EnvField::new("log_level", "LOG_LEVEL").with_default("info"),
    ];
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    tracing::info!("hotconf v{} starting", env!("CARGO_PKG_VERSION"));

    let mut file = FileAdaptor::new(&cli.file);
    match cli.format.as_deref() {
        Some("toml") => file = file.with_format(FileFormat::Toml),
        Some("yaml") => file = file.with_format(FileFormat::Yaml),
        _ => {}
    }
    let file = Arc::new(file);

    let operator = Operator::new(
        ServiceConfig::default(),
        [
            with_reader(EnvAdaptor::new(&cli.prefix)),
            with_reader(file.clone()),
            with_writer(file.clone()),
            with_notifier(FileWatcher::new(&cli.file, file.clone())),
        ],
    );

    let shutdown = Shutdown::new();
    operator.process(&shutdown)?;

    let config = operator.config();
    let current = config.load();
    tracing::info!(
        host = %current.host,
        port = current.port,
        log_level = %current.log_level,
        path = ?cli.file,
        "Watching configuration"
    );

    let mut changes = config.subscribe();
    let signal = shutdown_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            _ = &mut signal => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = config.load();
                tracing::info!(
                    version = *changes.borrow_and_update(),
                    host = %current.host,
                    port = current.port,
                    "Configuration reloaded"
                );
            }
        }
    }

    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
