//! Overlaying decoded documents onto typed configs.
//!
//! Sources decode into a `serde_json::Value` tree. The config is rendered to the
//! same tree, the overlay is merged key by key, and the result is decoded back.
//! Keys absent from the overlay keep their current values.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{SourceError, SourceResult};

/// Merge `overlay` into `base`. Maps merge recursively; anything else replaces.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `overlay` to `config`. On error `config` is left as it was.
pub fn apply<T>(config: &mut T, overlay: Value, origin: &str) -> SourceResult<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut tree = to_tree(config, origin)?;
    merge(&mut tree, overlay);
    *config = serde_json::from_value(tree).map_err(|e| SourceError::malformed(origin, e))?;
    Ok(())
}

/// Render `config` as a value tree.
pub fn to_tree<T: Serialize>(config: &T, origin: &str) -> SourceResult<Value> {
    serde_json::to_value(config).map_err(|e| SourceError::malformed(origin, e))
}

/// Whether `value` is the zero value of its type.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Look up a dotted `path` such as `server.port`.
pub fn get_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(tree, |node, key| node.get(key))
}

/// Build an overlay that sets only the dotted `path` to `value`.
pub fn overlay_for(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, key| {
        let mut map = Map::new();
        map.insert(key.to_string(), inner);
        Value::Object(map)
    })
}
