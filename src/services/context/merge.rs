//! Context merge semantics.
//!
//! Resolution folds ancestor data into child data with deep-merge rules:
//! objects merge by key recursively, arrays are replaced wholesale, and a
//! null in the child removes the key. Updates to a single row use
//! last-writer-wins per top-level key.

use serde_json::{Map, Value};

use crate::domain::models::ContextLevel;

/// Deep-merge `child` on top of `base`, in place.
pub fn deep_merge(base: &mut Value, child: &Value) {
    match (base, child) {
        (Value::Object(base_map), Value::Object(child_map)) => {
            for (key, child_value) in child_map {
                if child_value.is_null() {
                    base_map.remove(key);
                } else if let Some(base_value) = base_map.get_mut(key) {
                    if base_value.is_object() && child_value.is_object() {
                        deep_merge(base_value, child_value);
                    } else {
                        *base_value = child_value.clone();
                    }
                } else {
                    base_map.insert(key.clone(), child_value.clone());
                }
            }
        }
        (base_slot, child_value) => {
            // Arrays and scalars replace wholesale.
            *base_slot = child_value.clone();
        }
    }
}

/// Fold a root-first list of `(tier, data)` layers into the effective map,
/// recording which tier supplied the final value of each top-level key.
pub fn fold_layers(
    layers: &[(ContextLevel, Value)],
) -> (Value, std::collections::BTreeMap<String, ContextLevel>) {
    let mut effective = Value::Object(Map::new());
    let mut provenance = std::collections::BTreeMap::new();

    for (level, data) in layers {
        if let Value::Object(map) = data {
            for (key, value) in map {
                if value.is_null() {
                    provenance.remove(key);
                } else {
                    provenance.insert(key.clone(), *level);
                }
            }
        }
        deep_merge(&mut effective, data);
    }

    (effective, provenance)
}

/// Last-writer-wins merge of `incoming` top-level keys into `stored`.
/// A null value removes the key.
pub fn merge_update(stored: &mut Value, incoming: &Value) {
    let Value::Object(incoming_map) = incoming else {
        return;
    };
    if !stored.is_object() {
        *stored = Value::Object(Map::new());
    }
    let Value::Object(stored_map) = stored else { unreachable!() };
    for (key, value) in incoming_map {
        if value.is_null() {
            stored_map.remove(key);
        } else {
            stored_map.insert(key.clone(), value.clone());
        }
    }
}
