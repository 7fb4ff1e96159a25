use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RunStatus;

/// One logical execution of a workflow for one Request.
///
/// Invariant: `status` only ever moves forward along the DAG described by
/// [`RunStatus`]; a retry is the sole path back into `Pending` from a
/// terminal state, and it bumps `retry_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: Uuid,
    pub workflow_fingerprint: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub errors: HashMap<String, String>,
    #[serde(default)]
    pub retry_count: u32,
    pub ttl_seconds: u64,
    /// Original request payload, stored verbatim for retry reconstruction.
    pub request_data: serde_json::Value,
}

impl Run {
    pub fn new(run_id: Uuid, workflow_fingerprint: String, ttl_seconds: u64, request_data: serde_json::Value) -> Self {
        let now = Utc::now();
        Self { run_id,
               workflow_fingerprint,
               status: RunStatus::Created,
               created_at: now,
               updated_at: now,
               started_at: None,
               completed_at: None,
               results: HashMap::new(),
               errors: HashMap::new(),
               retry_count: 0,
               ttl_seconds,
               request_data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_starts_created_with_no_timestamps() {
        let run = Run::new(Uuid::new_v4(), "fp".into(), 3600, serde_json::json!({}));
        assert_eq!(run.status, RunStatus::Created);
        assert!(run.started_at.is_none());
        assert!(run.completed_at.is_none());
        assert_eq!(run.retry_count, 0);
    }
}
