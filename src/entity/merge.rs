//! RFC 7396 JSON merge patch.
//!
//! Applied by the store's update operations so the advertised
//! merge-patch contract holds under the same write transaction: a null
//! patch value removes the key, objects merge recursively, anything
//! else replaces.

use serde_json::{Map, Value};

/// Compute `target` patched by `patch` per RFC 7396.
pub fn merge_patch(target: &Value, patch: &Value) -> Value {
    match patch {
        Value::Object(patch_map) => {
            let mut result = match target {
                Value::Object(map) => map.clone(),
                _ => Map::new(),
            };
            for (key, value) in patch_map {
                if value.is_null() {
                    result.remove(key);
                } else {
                    let base = result.get(key).cloned().unwrap_or(Value::Null);
                    result.insert(key.clone(), merge_patch(&base, value));
                }
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}
