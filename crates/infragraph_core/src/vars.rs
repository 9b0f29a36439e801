//! Variable inheritance between an infrastructure and its nodes.

use serde_json::{Map, Value};

/// Variable set, keyed by variable name
pub type Variables = Map<String, Value>;

/// Merge `overlay` on top of `base`.
///
/// Keys present in `overlay` win. Where both sides hold a mapping under
/// the same key the two mappings are merged with the same rule, so a node
/// can override a single nested setting without restating its siblings.
#[must_use]
pub fn merge_variables(base: &Variables, overlay: &Variables) -> Variables {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match (merged.get(key), value) {
            (Some(Value::Object(left)), Value::Object(right)) => {
                Value::Object(merge_variables(left, right))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}
