//! YAML and TOML file reader/writer.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::adaptors::merge;
use crate::error::{SourceError, SourceResult};
use crate::source::{ConfigReader, ConfigWriter};

/// Document format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Yaml,
    Toml,
}

impl FileFormat {
    /// Pick the format from the file extension. Anything but `.toml` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    fn decode(self, content: &str) -> Result<Value, String> {
        match self {
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    fn encode<T: Serialize>(self, config: &T) -> Result<String, String> {
        match self {
            Self::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
            Self::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
        }
    }
}

/// Reads a config document from a file and writes the config back to it.
#[derive(Debug, Clone)]
pub struct FileAdaptor {
    path: PathBuf,
    name: String,
    format: FileFormat,
}

impl FileAdaptor {
    /// Adaptor for `path`, format chosen by extension.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            format: FileFormat::from_path(&path),
            path,
        }
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }
}

impl<T> ConfigReader<T> for FileAdaptor
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, config: &mut T) -> SourceResult<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = ?self.path, "Config file absent, nothing to read");
                return Ok(());
            }
            Err(e) => return Err(SourceError::unavailable(&self.name, e)),
        };

        if content.trim().is_empty() {
            return Ok(());
        }

        let document = self
            .format
            .decode(&content)
            .map_err(|e| SourceError::malformed(&self.name, e))?;
        if document.is_null() {
            return Ok(());
        }

        merge::apply(config, document, &self.name)
    }
}

impl<T> ConfigWriter<T> for FileAdaptor
where
    T: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, config: &T) -> SourceResult<()> {
        let content = self
            .format
            .encode(config)
            .map_err(|e| SourceError::sink_write(&self.name, e))?;

        // Rewriting identical bytes would wake a watcher on this file for nothing.
        if fs::read(&self.path).is_ok_and(|existing| existing == content.as_bytes()) {
            tracing::trace!(path = ?self.path, "Config file unchanged, write skipped");
            return Ok(());
        }

        fs::write(&self.path, content).map_err(|e| SourceError::sink_write(&self.name, e))?;
        tracing::debug!(path = ?self.path, "Config file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct TestConfig {
        host: String,
        port: u16,
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a/config.toml")), FileFormat::Toml);
        assert_eq!(FileFormat::from_path(Path::new("config.TOML")), FileFormat::Toml);
        assert_eq!(FileFormat::from_path(Path::new("config.yml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("config")), FileFormat::Yaml);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let adaptor = FileAdaptor::new(dir.path().join("config.yaml"));

        let mut config = TestConfig::default();
        adaptor.read(&mut config).unwrap();
        assert_eq!(config, TestConfig::default());
    }

    #[test]
    fn test_empty_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "").unwrap();

        let mut config = TestConfig {
            host: "kept".into(),
            port: 1,
        };
        FileAdaptor::new(&path).read(&mut config).unwrap();
        assert_eq!(config.host, "kept");
        assert_eq!(config.port, 1);
    }

    #[test]
    fn test_reads_subset_of_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "host: 0.0.0.0\n").unwrap();

        let mut config = TestConfig::default();
        FileAdaptor::new(&path).read(&mut config).unwrap();
        assert_eq!(
            config,
            TestConfig {
                host: "0.0.0.0".into(),
                port: 0,
            }
        );
    }

    #[test]
    fn test_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "host: [unclosed\n").unwrap();

        let mut config = TestConfig::default();
        let err = FileAdaptor::new(&path).read(&mut config).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = TestConfig::default();
        let err = FileAdaptor::new(dir.path()).read(&mut config).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[test]
    fn test_toml_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let adaptor = FileAdaptor::new(&path);

        let written = TestConfig {
            host: "example.org".into(),
            port: 8443,
        };
        adaptor.write(&written).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("port = 8443"));

        let mut read = TestConfig::default();
        adaptor.read(&mut read).unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn test_write_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "host: old\nport: 1\nstale: true\n").unwrap();

        FileAdaptor::new(&path)
            .write(&TestConfig {
                host: "new".into(),
                port: 2,
            })
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.contains("host: new"));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let adaptor = FileAdaptor::new(dir.path().join("missing").join("config.yaml"));

        let err = adaptor.write(&TestConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::SinkWrite { .. }));
    }
}
