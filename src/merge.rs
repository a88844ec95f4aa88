//! Deep merge of parsed config documents.
//!
//! Mappings are merged key by key, recursively. Anything else (scalars,
//! sequences, null, or a type mismatch) is replaced wholesale by the later
//! value. Sequences are never concatenated.

use serde_json::Value;

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base,
///   keys only in base are kept
/// - Any other pairing: overlay replaces base entirely
///
/// # Example
/// ```
/// use serde_json::json;
/// use overlay_config::merge::deep_merge;
///
/// let base = json!({"foo": {"bar": 1, "baz": 2}});
/// let overlay = json!({"foo": {"baz": 3}, "quux": "hi"});
/// let result = deep_merge(base, overlay);
/// assert_eq!(result, json!({"foo": {"bar": 1, "baz": 3}, "quux": "hi"}));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge values in order, later values taking precedence.
///
/// Left fold of [`deep_merge`] seeded with the first value, so a single
/// value comes back untouched. Returns `None` for an empty input.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Option<Value> {
    let mut values = values.into_iter();
    let first = values.next()?;
    Some(values.fold(first, deep_merge))
}
