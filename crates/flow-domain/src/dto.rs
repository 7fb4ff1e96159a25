//! Transport-agnostic shapes exchanged across the intake API, the event
//! publisher, and the retry endpoint (§6). These are plain data — no
//! behavior — so both the HTTP layer and the message-bus layer can share
//! one definition instead of re-deriving it at each boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RunStatus;

/// One entry's disposition after intake-time dedupe: either newly queued for
/// processing, or a reference to the run that already owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStatus {
    pub entry_hash: String,
    pub run_id: Uuid,
}

/// Counts surfaced on every 200-class `ExecutionResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounts {
    pub total: usize,
    pub processed: usize,
    pub duplicate: usize,
}

/// Body of a 200 response from `POST /workflows/<kind>/execute`.
///
/// `run_id` is `None` exactly when every entry in the request was a
/// duplicate (§8 "Empty entries (after dedupe)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub run_id: Option<Uuid>,
    pub processed: Vec<EntryStatus>,
    pub duplicates: Vec<EntryStatus>,
    pub counts: ExecutionCounts,
}

/// Body of a 409 `DuplicateTransaction` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateTransactionBody {
    pub transaction_hash: String,
    pub existing_exchange_id: Uuid,
    pub error: String,
}

impl DuplicateTransactionBody {
    pub fn new(transaction_hash: impl Into<String>, existing_exchange_id: Uuid) -> Self {
        Self { transaction_hash: transaction_hash.into(),
               existing_exchange_id,
               error: "DuplicateTransaction".to_string() }
    }
}

/// Body of `GET /workflows/{run_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub results: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub errors: HashMap<String, String>,
}

/// Body of `POST /retry?max_retries=N`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct RetryStats {
    pub total_found: usize,
    pub retry_initiated: usize,
    pub retry_failed: usize,
}

/// One binary artifact carried in the results envelope, always inline
/// base64 — the core never writes artifacts to disk or a bucket itself
/// (§1 "file I/O for artifacts" is a collaborator's job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPayload {
    pub filename: String,
    pub content_type: String,
    pub data: String,
}

impl ArtifactPayload {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine;
        Self { filename: filename.into(),
               content_type: content_type.into(),
               data: base64::engine::general_purpose::STANDARD.encode(bytes) }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}

/// What goes into a Run's `results` map on success (§6 "Results envelope").
/// `extra` absorbs any additional per-kind serializable keys (e.g.
/// `payment_url`) without widening this struct for every workflow kind.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResultsEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<ArtifactPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<ArtifactPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ResultsEnvelope {
    /// Lifts a step engine's raw shared-resource results map (allow-listed
    /// keys only, per `RunContext::take_allowed`) into the envelope shape.
    /// `pdf`/`png` are pulled out when the step that produced them stashed
    /// a well-formed `ArtifactPayload`; a malformed value under either key
    /// is dropped rather than surfaced, since the engine never stashes
    /// anything but `ArtifactPayload` JSON there in practice.
    pub fn from_results(mut results: HashMap<String, serde_json::Value>) -> Self {
        let pdf = results.remove("pdf").and_then(|v| serde_json::from_value(v).ok());
        let png = results.remove("png").and_then(|v| serde_json::from_value(v).ok());
        let payment_url = results.remove("payment_url").and_then(|v| v.as_str().map(str::to_string));
        Self { pdf, png, payment_url, extra: results }
    }
}

/// Terminal event published once per Run, keyed by `exchange_id` (the
/// `run_id`) for partition affinity on the bus (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFinishedEvent {
    pub exchange_id: Uuid,
    pub workflow_type: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResultsEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_round_trips_through_base64() {
        let bytes = b"not really a pdf";
        let artifact = ArtifactPayload::new("v.pdf", "application/pdf", bytes);
        assert_eq!(artifact.decode().unwrap(), bytes);
    }

    #[test]
    fn results_envelope_flattens_extra_keys() {
        let mut envelope = ResultsEnvelope::default();
        envelope.payment_url = Some("https://pay.example/x".into());
        envelope.extra.insert("voucher_number".into(), serde_json::json!("000123"));
        let v = serde_json::to_value(&envelope).unwrap();
        assert_eq!(v["payment_url"], "https://pay.example/x");
        assert_eq!(v["voucher_number"], "000123");
        assert!(v.get("pdf").is_none());
    }
}
