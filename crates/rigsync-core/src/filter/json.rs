//! Recursive JSON filtering and merge over `serde_json::Value`.

use super::MachineKeySet;
use serde_json::Value;
use tracing::warn;

/// Remove machine-specific keys from every object in the tree, including
/// objects nested inside arrays.
pub fn filter_value(value: &mut Value, keys: &MachineKeySet) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !keys.contains(k));
            for child in map.values_mut() {
                filter_value(child, keys);
            }
        }
        Value::Array(items) => {
            for child in items {
                filter_value(child, keys);
            }
        }
        _ => {}
    }
}

/// Overlay this machine's values for machine-specific keys onto an incoming
/// tree, at every object nesting level.
///
/// Non-machine keys keep their incoming values; where both sides hold an
/// object under the same key, the merge recurses. Arrays are not descended,
/// element correspondence across machines is undefined.
#[must_use]
pub fn merge_value(incoming: Value, local: &Value, keys: &MachineKeySet) -> Value {
    let mut merged = incoming;
    merge_into(&mut merged, local, keys);
    merged
}

fn merge_into(target: &mut Value, local: &Value, keys: &MachineKeySet) {
    let (Value::Object(target_map), Value::Object(local_map)) = (target, local) else {
        return;
    };
    for (key, local_child) in local_map {
        if keys.contains(key) {
            target_map.insert(key.clone(), local_child.clone());
        } else if let Some(target_child) = target_map.get_mut(key) {
            merge_into(target_child, local_child, keys);
        }
    }
}

/// Parse, filter, and pretty-print a JSON document.
///
/// A document that does not parse is returned unchanged so the capture is
/// taken verbatim rather than dropped; the leak is logged.
#[must_use]
pub fn filter_str(raw: &str, keys: &MachineKeySet) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(mut value) => {
            filter_value(&mut value, keys);
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string())
        }
        Err(e) => {
            warn!(error = %e, "Captured JSON did not parse; keeping it unfiltered");
            raw.to_string()
        }
    }
}

/// Merge an incoming JSON document against the local one and pretty-print
/// the result.
///
/// If either side fails to parse, the incoming document is applied verbatim
/// and the failure is logged.
#[must_use]
pub fn merge_str(incoming_raw: &str, local_raw: &str, keys: &MachineKeySet) -> String {
    let incoming = match serde_json::from_str::<Value>(incoming_raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Incoming JSON did not parse; applying it verbatim");
            return incoming_raw.to_string();
        }
    };
    let local = match serde_json::from_str::<Value>(local_raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Local JSON did not parse; applying incoming verbatim");
            return incoming_raw.to_string();
        }
    };
    let merged = merge_value(incoming, &local, keys);
    serde_json::to_string_pretty(&merged).unwrap_or_else(|_| incoming_raw.to_string())
}
