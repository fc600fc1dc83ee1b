//! Snake-case to camel-case key conversion for outward-facing JSON.

use serde_json::{Map, Value};

/// Converts `first_passage_urn` to `firstPassageUrn`. Leading underscores are
/// kept, and segments after the first are capitalized.
pub fn to_camel_case(key: &str) -> String {
    let trimmed = key.trim_start_matches('_');
    let prefix = &key[..key.len() - trimmed.len()];

    let mut out = String::with_capacity(key.len());
    out.push_str(prefix);
    for (i, part) in trimmed.split('_').enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Recursively rewrites every object key in `value` to camel case.
pub fn camelize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(to_camel_case(k), camelize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(camelize).collect()),
        other => other.clone(),
    }
}
