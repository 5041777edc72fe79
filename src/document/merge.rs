//! Additive schema migration for stored documents.

use serde_json::Value;

/// Add every top-level key of `defaults` that `doc` lacks.
///
/// Existing keys are never overwritten, nested objects are not merged, and a
/// non-object `doc` is returned unchanged.
pub fn backfill_defaults(doc: Value, defaults: &Value) -> Value {
    match (doc, defaults) {
        (Value::Object(mut map), Value::Object(default_map)) => {
            for (key, value) in default_map {
                if !map.contains_key(key) {
                    map.insert(key.clone(), value.clone());
                }
            }
            Value::Object(map)
        }
        (doc, _) => doc,
    }
}
