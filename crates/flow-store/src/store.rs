//! The `TransactionStore` contract (§4.2). Every operation returns a
//! success indicator or an `Option`/`HashMap` of what it found — nothing
//! crosses this boundary as an `Err`. Implementations log and swallow their
//! own backend failures (see [`crate::error::StoreError`]).

use std::collections::HashMap;

use async_trait::async_trait;
use flow_domain::{ErrorKind, RunStatus};
use serde_json::Value;
use uuid::Uuid;

use crate::record::TransactionRecord;

/// What a status transition optionally carries: shallow-merged result keys
/// (new wins) plus the per-step error message/kind pairs the step engine
/// produced (§4.2 `update_status`), plus an optional overwrite of the
/// record's retry budget counter (the retry sweeper's only write path).
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub results: HashMap<String, Value>,
    pub errors: HashMap<String, String>,
    pub error_kinds: HashMap<String, ErrorKind>,
    pub retry_count: Option<u32>,
}

impl StatusUpdate {
    pub fn results(results: HashMap<String, Value>) -> Self {
        Self { results, ..Default::default() }
    }
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Looks up `fingerprint` in the hash index. Returns the key the
    /// fingerprint currently maps to, if any — callers resolve the owning
    /// run by reading that key's record.
    async fn check_duplicate(&self, fingerprint: &str) -> Option<String>;

    /// Atomically writes a new record at `key` and claims `fingerprint` in
    /// the hash index. `false` if the fingerprint was already claimed (by
    /// this or any other key) — in that case nothing was written.
    async fn create_transaction(&self, key: &str, fingerprint: &str, exchange_id: Uuid, request_data: Value,
                                 ttl_seconds: u64)
                                 -> bool;

    /// Merges `update` (if any) into the existing record — results
    /// shallow-overwritten (new wins), errors/error_kinds shallow-merged —
    /// and advances its status, preserving the record's original TTL.
    /// `false` if `key` doesn't exist.
    async fn update_status(&self, key: &str, status: RunStatus, update: Option<StatusUpdate>) -> bool;

    async fn get_transaction(&self, key: &str) -> Option<TransactionRecord>;

    /// Convenience wrapper over `update_status` for callers that only
    /// change status (the monitor loop, mostly).
    async fn set_workflow_status(&self, key: &str, status: RunStatus) -> bool {
        self.update_status(key, status, None).await
    }

    async fn get_transactions_by_status(&self, status: RunStatus) -> HashMap<String, TransactionRecord>;

    /// Releases a short-lived claim taken via `create_transaction`: removes
    /// both the record at `key` and, if `key` is still the current holder,
    /// the fingerprint's entry in the hash index. A no-op if `key` never
    /// held `fingerprint` (already expired, already released, or lost the
    /// claim to someone else) — callers don't need to check first.
    ///
    /// Exists so a claim only needs to block for as long as its arbitration
    /// window actually lasts, rather than for its full TTL: the in-memory
    /// backend never sweeps expired TTLs at all, so without an explicit
    /// release a claim would block every later caller for that fingerprint
    /// forever, not just for the window two concurrent submissions race in.
    async fn release_claim(&self, key: &str, fingerprint: &str);

    /// Releases backend resources (connection pools, background tasks).
    /// A no-op for the in-memory backend.
    async fn close(&self);
}
