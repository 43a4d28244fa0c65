//! Hashing System - SHA-256 for Instance Provenance
//!
//! Deterministic, reproducible hashes so a generated instance can be
//! traced back to exactly one (baseline, profile, engine) combination.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::profile::Profile;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> =
                sorted.into_iter().map(|(k, v)| (k.clone(), sort_value(v))).collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Hash of the fully assembled instance document.
pub fn compute_manifest_hash<T: Serialize>(instance: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(instance)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash of the deterministic inputs of a generation run:
/// run_hash = sha256(library_id + library_version + canonical_profile + engine_version).
/// Identical inputs always produce an identical run hash; timestamps and
/// run ids are deliberately excluded.
pub fn compute_run_hash(
    library_id: &str,
    library_version: &str,
    profile: &Profile,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_profile = canonical_json(profile)?;
    let combined =
        format!("{}:{}:{}:{}", library_id, library_version, canonical_profile, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

// We need hex encoding
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
