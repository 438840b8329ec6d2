//! Hashing System - SHA-256 Design Fingerprints
//!
//! Identical design inputs always produce the identical fingerprint, so
//! production can tell a re-submitted design from a changed one.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// fingerprint = sha256(engine_version + ":" + canonical_content)
pub fn compute_fingerprint(content: &impl Serialize, engine_version: &str) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(content)?;
    Ok(sha256_hex(format!("{engine_version}:{canonical}").as_bytes()))
}
