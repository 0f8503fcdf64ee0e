//! Deep traversal for `deep` watchers.

use std::collections::HashSet;

use super::value::Value;

/// Read every nested property of `value` so that the current watcher
/// subscribes to all of them. Frozen containers are skipped. Each container
/// is visited once, so cyclic structures terminate.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    visit(value, &mut seen);
}

fn visit(value: &Value, seen: &mut HashSet<usize>) {
    match value {
        Value::Array(array) => {
            if array.is_frozen() || !seen.insert(array.addr()) {
                return;
            }
            for item in array.to_vec() {
                visit(&item, seen);
            }
        }
        Value::Object(object) => {
            if object.is_frozen() || !seen.insert(object.addr()) {
                return;
            }
            for key in object.keys() {
                visit(&object.get(&key), seen);
            }
        }
        _ => {}
    }
}
