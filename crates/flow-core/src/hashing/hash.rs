//! Hash helpers — abstracts the digest algorithm behind a string-in,
//! hex-out interface so the rest of the core never imports a digest crate
//! directly.
//!
//! SHA-256 is mandated by the fingerprinting contract (stable, widely
//! verifiable hex digests for deduplication keys that may be compared
//! across process restarts and across languages).

use crate::hashing::to_canonical_json;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hashes a string and returns its hex digest.
pub fn hash_str(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hashes a JSON value after canonicalizing it.
pub fn hash_value(v: &Value) -> String {
    let canonical = to_canonical_json(v);
    hash_str(&canonical)
}
