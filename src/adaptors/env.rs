//! Environment variable reader.
//!
//! Each bound field is read from `<PREFIX>_<TAG>`. A set variable always wins.
//! An unset variable falls back to the declared default, but only while the
//! field still holds its zero value.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::adaptors::merge;
use crate::error::{SourceError, SourceResult};
use crate::source::ConfigReader;

/// One environment-bound field of a config type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvField {
    /// Serialized field path, dotted for nested fields (`server.port`).
    pub path: &'static str,
    /// Variable suffix appended to the prefix.
    pub tag: &'static str,
    /// Literal applied when the variable is unset and the field is zero.
    pub default: Option<&'static str>,
}

impl EnvField {
    pub const fn new(path: &'static str, tag: &'static str) -> Self {
        Self {
            path,
            tag,
            default: None,
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// Config types that can be populated from the environment.
///
/// ```
/// use hotconf::adaptors::{EnvBinding, EnvField};
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Config {
///     host: String,
///     port: u16,
/// }
///
/// impl EnvBinding for Config {
///     const ENV_FIELDS: &'static [EnvField] = &[
///         EnvField::new("host", "HOST").with_default("127.0.0.1"),
///         EnvField::new("port", "PORT").with_default("80"),
///     ];
/// }
/// ```
pub trait EnvBinding {
    const ENV_FIELDS: &'static [EnvField];
}

/// Reads [`EnvBinding`] fields from prefixed environment variables.
#[derive(Debug, Clone)]
pub struct EnvAdaptor {
    prefix: String,
}

impl EnvAdaptor {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Full variable name for `tag`.
    pub fn key(&self, tag: &str) -> String {
        if self.prefix.is_empty() {
            tag.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, tag).to_uppercase()
        }
    }
}

impl<T> ConfigReader<T> for EnvAdaptor
where
    T: EnvBinding + Serialize + DeserializeOwned + Send + Sync,
{
    fn name(&self) -> &str {
        "env"
    }

    fn read(&self, config: &mut T) -> SourceResult<()> {
        let mut tree = merge::to_tree(config, "env")?;

        for field in T::ENV_FIELDS {
            let key = self.key(field.tag);
            let current = merge::get_path(&tree, field.path);

            let raw = match std::env::var(&key) {
                Ok(raw) => raw,
                Err(std::env::VarError::NotPresent) => {
                    match field.default {
                        Some(default) if current.map_or(true, merge::is_zero) => default.to_string(),
                        _ => continue,
                    }
                }
                Err(e) => return Err(SourceError::malformed(key, e)),
            };

            let value = bind::<T>(&tree, field.path, &raw);
            tracing::trace!(variable = %key, field = field.path, "Environment value bound");
            merge::merge(&mut tree, merge::overlay_for(field.path, value));
        }

        *config = serde_json::from_value(tree).map_err(|e| SourceError::malformed("env", e))?;
        Ok(())
    }
}

/// Interpret `raw` for the field at `path`, by what the field accepts.
///
/// Text is parsed as a YAML scalar so numbers, booleans and inline lists come
/// through typed. When the field holds a string, or the typed value does not
/// deserialize into `T` (an unset `Option<String>`, say), the raw text is used.
fn bind<T: DeserializeOwned>(tree: &Value, path: &str, raw: &str) -> Value {
    let text = || Value::String(raw.to_string());
    if matches!(merge::get_path(tree, path), Some(Value::String(_))) {
        return text();
    }

    let typed = match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::String(_)) | Err(_) => return text(),
        Ok(typed) => typed,
    };

    let mut candidate = tree.clone();
    merge::merge(&mut candidate, merge::overlay_for(path, typed.clone()));
    if serde_json::from_value::<T>(candidate).is_ok() {
        typed
    } else {
        text()
    }
}
