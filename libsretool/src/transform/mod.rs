//! Deep value substitution over JSON-like documents.

use serde_json::Value;


/// Replaces every scalar leaf of `value` that equals a key of `replacements`
/// with the paired value.
///
/// Arrays and objects are walked recursively. Object keys are never
/// replaced, and a replacement value is not itself walked again.
///
/// # Examples
///
/// ```
/// use libsretool::transform::replace_values;
/// use serde_json::json;
///
/// let mut doc = json!({"image": "IMAGE", "tags": ["IMAGE", "v1"]});
/// replace_values(&mut doc, &[(json!("IMAGE"), json!("quay.io/org/app"))]);
/// assert_eq!(doc, json!({"image": "quay.io/org/app", "tags": ["quay.io/org/app", "v1"]}));
/// ```
pub fn replace_values(value: &mut Value, replacements: &[(Value, Value)]) {
    match value {
        Value::Array(items) => {
            for item in items {
                replace_values(item, replacements);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                replace_values(item, replacements);
            }
        }
        scalar => {
            if let Some((_, replacement)) = replacements.iter().find(|(from, _)| *from == *scalar)
            {
                *scalar = replacement.clone();
            }
        }
    }
}

/// Like [`replace_values`], but returns the transformed document.
pub fn replaced(mut value: Value, replacements: &[(Value, Value)]) -> Value {
    replace_values(&mut value, replacements);
    value
}
