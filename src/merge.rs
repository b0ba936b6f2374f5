use serde_json::{Map, Value};

/// Deep-merges `overlay` on top of `base`.
///
/// Objects merge key by key. Any other overlay value, arrays included, replaces
/// whatever `base` held for that key. A missing overlay leaves `base` untouched.
pub fn deep_merge(base: Value, overlay: Option<&Value>) -> Value {
    let mut merged = base;
    if let Some(overlay) = overlay {
        merge_into(&mut merged, overlay);
    }

    return merged;
}

pub fn merge_into(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => {
            *slot = value.clone();
        }
    }
}

/// Merges `overlay` into the object stored under `key`, creating it when absent.
pub fn merge_at(target: &mut Value, key: &str, overlay: &Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(map) = target {
        let slot = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        merge_into(slot, overlay);
    }
}
