//! Hashing and JSON canonicalization.
//!
//! `to_canonical_json` guarantees stable key order for JSON objects so two
//! structurally-equal values always hash the same; `hash_str`/`hash_value`
//! produce the stable hex digests the fingerprinting module builds on.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value};
