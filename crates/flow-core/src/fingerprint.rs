//! Deterministic SHA-256 fingerprinting of requests and entries (C2).
//!
//! Both functions are pure: same input always yields the same hex digest,
//! across process restarts and across languages, since the input is a
//! plain pipe-joined string rather than a language-specific serialization.

use flow_domain::FingerprintFields;

use crate::hashing::hash_str;

/// SHA-256 hex over the pipe-joined canonical field order of one entry's
/// critical fields.
pub fn entry_hash<E: FingerprintFields>(entry: &E) -> String {
    hash_str(&entry.canonical_fields().join("|"))
}

/// SHA-256 hex over `credentials_id ∥ "|" ∥ join("|", sort(entry_canonical_forms))`.
///
/// Entry canonical forms are each entry's pipe-joined fields, sorted
/// lexicographically on the byte string before being joined into the
/// outer digest input.
pub fn workflow_hash<E: FingerprintFields>(credentials_id: &str, entries: &[E]) -> String {
    let mut forms: Vec<String> = entries.iter().map(|e| e.canonical_fields().join("|")).collect();
    forms.sort();
    let input = format!("{}|{}", credentials_id, forms.join("|"));
    hash_str(&input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_domain::{PaymentMethod, ReconciliationEntry};

    fn entry(period_from: &str) -> ReconciliationEntry {
        ReconciliationEntry { period_from: period_from.into(),
                               period_to: "12/2025".into(),
                               calculation_date: "15/09/2025".into(),
                               form_payment: PaymentMethod::Qr,
                               expiration_date: "31/12/2025".into(),
                               taxpayer_type: None,
                               tax_type: None,
                               include_interests: false }
    }

    #[test]
    fn entry_hash_is_deterministic() {
        let e = entry("01/2023");
        assert_eq!(entry_hash(&e), entry_hash(&e));
    }

    #[test]
    fn entry_hash_changes_with_fields() {
        assert_ne!(entry_hash(&entry("01/2023")), entry_hash(&entry("02/2023")));
    }

    #[test]
    fn workflow_hash_is_order_independent() {
        let a = entry("01/2023");
        let b = entry("02/2023");
        let h1 = workflow_hash("20429994323", &[a.clone(), b.clone()]);
        let h2 = workflow_hash("20429994323", &[b, a]);
        assert_eq!(h1, h2);
    }

    #[test]
    fn workflow_hash_changes_with_credentials_id() {
        let entries = [entry("01/2023")];
        let h1 = workflow_hash("20429994323", &entries);
        let h2 = workflow_hash("20111111112", &entries);
        assert_ne!(h1, h2);
    }
}
