//! Service property dictionaries

use crate::{DmError, DmResult};
use std::collections::BTreeMap;

/// Opaque key/value dictionary attached to services and configurations
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Interface names a service is registered under
pub const OBJECT_CLASS: &str = "objectClass";
/// Registry-assigned service id
pub const SERVICE_ID: &str = "service.id";
/// Provider ranking, higher wins
pub const SERVICE_RANKING: &str = "service.ranking";
/// Persistent identity of a configuration
pub const SERVICE_PID: &str = "service.pid";

/// Copies every entry of `additional` into `target`, overwriting existing keys
pub fn merge_into(target: &mut Properties, additional: &Properties) {
    for (key, value) in additional {
        target.insert(key.clone(), value.clone());
    }
}

/// Looks up a property ignoring key case
pub fn get_ignore_case<'a>(properties: &'a Properties, key: &str) -> Option<&'a serde_json::Value> {
    properties
        .get(key)
        .or_else(|| properties.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

/// Rejects empty keys and keys that differ only by case
pub fn validate(properties: &Properties) -> DmResult<()> {
    let mut seen: Vec<String> = Vec::with_capacity(properties.len());
    for key in properties.keys() {
        if key.trim().is_empty() {
            return Err(DmError::InvalidProperties("empty property key".to_string()));
        }
        let lowered = key.to_ascii_lowercase();
        if seen.contains(&lowered) {
            return Err(DmError::InvalidProperties(format!(
                "duplicate property key ignoring case: {key}"
            )));
        }
        seen.push(lowered);
    }
    Ok(())
}

/// Reads the ranking property, defaulting to 0 when missing or not an integer
pub fn ranking(properties: &Properties) -> i64 {
    properties
        .get(SERVICE_RANKING)
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0)
}
