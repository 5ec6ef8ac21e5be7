//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use serde::{Deserialize, Serialize};

use hotconf::adaptors::{EnvBinding, EnvField};
use hotconf::error::SourceResult;
use hotconf::{ConfigReader, ConfigWriter, SourceError};

/// Environment prefix used by every integration test.
pub const PREFIX: &str = "HOTRELOAD";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl EnvBinding for Config {
    const ENV_FIELDS: &'static [EnvField] = &[
        EnvField::new("host", "HOST").with_default("127.0.0.1"),
        EnvField::new("port", "PORT").with_default("80"),
    ];
}

/// Remove every variable the fixture config binds.
pub fn clear_env() {
    for field in Config::ENV_FIELDS {
        std::env::remove_var(format!("{}_{}", PREFIX, field.tag));
    }
}

/// Writer that keeps every config it is handed.
#[derive(Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<Config>>,
}

impl RecordingWriter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> Vec<Config> {
        self.writes.lock().unwrap().clone()
    }
}

impl ConfigWriter<Config> for RecordingWriter {
    fn name(&self) -> &str {
        "recording"
    }

    fn write(&self, config: &Config) -> SourceResult<()> {
        self.writes.lock().unwrap().push(config.clone());
        Ok(())
    }
}

/// Writer that always fails.
pub struct BrokenWriter;

impl ConfigWriter<Config> for BrokenWriter {
    fn write(&self, _: &Config) -> SourceResult<()> {
        Err(SourceError::sink_write("broken", "device unavailable"))
    }
}

/// Reader that sets the host to a fixed value.
pub struct HostReader(pub &'static str);

impl ConfigReader<Config> for HostReader {
    fn read(&self, config: &mut Config) -> SourceResult<()> {
        config.host = self.0.to_string();
        Ok(())
    }
}
