//! The transaction record (§6 "Store schema"): the on-disk shape of both a
//! Run's own status entry (keyed by `run_id`) and an Entry record (keyed by
//! `entry_hash`, payload `{entry, run_id}`). Both share this one shape —
//! the store has no notion of "Run" vs. "Entry", only opaque keyed records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flow_domain::{ErrorKind, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub status: RunStatus,
    pub transaction_hash: String,
    pub exchange_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub request_data: Value,
    #[serde(default)]
    pub results: HashMap<String, Value>,
    #[serde(default)]
    pub errors: HashMap<String, String>,
    /// Same keys as `errors`, carrying each failed step's [`ErrorKind`]
    /// instead of its message — what the retry sweeper classifies against
    /// (§7: classification MUST NOT parse error text).
    #[serde(default)]
    pub error_kinds: HashMap<String, ErrorKind>,
    #[serde(default)]
    pub retry_count: u32,
    pub ttl_seconds: u64,
}

impl TransactionRecord {
    pub fn new(transaction_hash: impl Into<String>, exchange_id: Uuid, request_data: Value, ttl_seconds: u64)
               -> Self {
        let now = Utc::now();
        Self { status: RunStatus::Created,
               transaction_hash: transaction_hash.into(),
               exchange_id,
               created_at: now,
               updated_at: now,
               request_data,
               results: HashMap::new(),
               errors: HashMap::new(),
               error_kinds: HashMap::new(),
               retry_count: 0,
               ttl_seconds }
    }

    /// Whether this record carries at least one step failure classified as
    /// retryable (§7/§4.10) — the retry sweeper's eligibility check, by
    /// error kind identity only, never by parsing `errors`' messages.
    pub fn has_retryable_error(&self) -> bool {
        self.error_kinds.values().any(|k| k.is_retryable())
    }

    /// Serializes the record into flat string fields, the shape every
    /// keyed-hash backend (Redis included) actually stores on the wire.
    pub fn to_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), self.status.as_str().to_string());
        fields.insert("transaction_hash".to_string(), self.transaction_hash.clone());
        fields.insert("exchange_id".to_string(), self.exchange_id.to_string());
        fields.insert("created_at".to_string(), self.created_at.to_rfc3339());
        fields.insert("updated_at".to_string(), self.updated_at.to_rfc3339());
        fields.insert("request_data".to_string(), self.request_data.to_string());
        fields.insert("results".to_string(), serde_json::to_string(&self.results).unwrap_or_else(|_| "{}".into()));
        fields.insert("errors".to_string(), serde_json::to_string(&self.errors).unwrap_or_else(|_| "{}".into()));
        fields.insert("error_kinds".to_string(),
                      serde_json::to_string(&self.error_kinds).unwrap_or_else(|_| "{}".into()));
        fields.insert("retry_count".to_string(), self.retry_count.to_string());
        fields.insert("ttl_seconds".to_string(), self.ttl_seconds.to_string());
        fields
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        use std::str::FromStr;
        let status = RunStatus::from_str(fields.get("status")?).ok()?;
        let transaction_hash = fields.get("transaction_hash")?.clone();
        let exchange_id = Uuid::parse_str(fields.get("exchange_id")?).ok()?;
        let created_at = DateTime::parse_from_rfc3339(fields.get("created_at")?).ok()?.with_timezone(&Utc);
        let updated_at = DateTime::parse_from_rfc3339(fields.get("updated_at")?).ok()?.with_timezone(&Utc);
        let request_data = fields.get("request_data")
                                 .and_then(|s| serde_json::from_str(s).ok())
                                 .unwrap_or(Value::Null);
        let results = fields.get("results").and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default();
        let errors = fields.get("errors").and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default();
        let error_kinds = fields.get("error_kinds").and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default();
        let retry_count = fields.get("retry_count").and_then(|s| s.parse().ok()).unwrap_or(0);
        let ttl_seconds = fields.get("ttl_seconds")?.parse().ok()?;
        Some(Self { status,
                    transaction_hash,
                    exchange_id,
                    created_at,
                    updated_at,
                    request_data,
                    results,
                    errors,
                    error_kinds,
                    retry_count,
                    ttl_seconds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_round_trip_preserves_every_attribute() {
        let mut record = TransactionRecord::new("fp", Uuid::new_v4(), serde_json::json!({"a": 1}), 3600);
        record.results.insert("payment_url".into(), serde_json::json!("https://pay"));
        record.errors.insert("capture_screenshot".into(), "timed out".into());
        record.error_kinds.insert("capture_screenshot".into(), ErrorKind::TransientInfrastructure);
        record.retry_count = 2;

        let fields = record.to_fields();
        let restored = TransactionRecord::from_fields(&fields).unwrap();
        assert_eq!(restored.transaction_hash, record.transaction_hash);
        assert_eq!(restored.exchange_id, record.exchange_id);
        assert_eq!(restored.retry_count, 2);
        assert_eq!(restored.results.get("payment_url").unwrap(), "https://pay");
        assert_eq!(restored.errors.get("capture_screenshot").unwrap(), "timed out");
        assert_eq!(restored.error_kinds.get("capture_screenshot"), Some(&ErrorKind::TransientInfrastructure));
        assert!(restored.has_retryable_error());
    }

    #[test]
    fn no_retryable_error_when_all_kinds_are_non_transient() {
        let mut record = TransactionRecord::new("fp", Uuid::new_v4(), serde_json::json!({}), 3600);
        record.error_kinds.insert("submit".into(), ErrorKind::BusinessRule);
        assert!(!record.has_retryable_error());
    }
}
