//! Nested submission flattening
//!
//! Nested objects are descended into and their keys joined with `.`.
//! Arrays are kept intact as opaque values, even when they hold objects.

use serde_json::{Map, Value};

/// Flatten a nested object into a single-level map with dotted keys
///
/// Key order follows a depth-first walk of the input, so the first
/// appearance of each key is preserved for schema reconciliation.
pub fn flatten(data: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(data, "", &mut flat);
    flat
}

fn flatten_into(data: &Map<String, Value>, prefix: &str, out: &mut Map<String, Value>) {
    for (key, value) in data {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &path, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}
