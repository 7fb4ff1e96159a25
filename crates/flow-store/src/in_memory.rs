//! In-memory fallback backend. Used when `TRANSACTION_STORE_ENABLED=false`
//! or in tests — the same semantics as the Redis backend, minus
//! persistence across restarts and minus real TTL eviction (TTLs are
//! recorded but never swept; this backend is for single-process testing
//! and degraded-mode operation, not long-running deployments).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use flow_domain::RunStatus;
use serde_json::Value;
use uuid::Uuid;

use crate::record::TransactionRecord;
use crate::store::{StatusUpdate, TransactionStore};

#[derive(Default)]
struct Inner {
    records: HashMap<String, TransactionRecord>,
    hash_index: HashMap<String, String>,
}

pub struct InMemoryTransactionStore {
    inner: Mutex<Inner>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn check_duplicate(&self, fingerprint: &str) -> Option<String> {
        self.inner.lock().unwrap().hash_index.get(fingerprint).cloned()
    }

    async fn create_transaction(&self, key: &str, fingerprint: &str, exchange_id: Uuid, request_data: Value,
                                 ttl_seconds: u64)
                                 -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.hash_index.contains_key(fingerprint) {
            return false;
        }
        let record = TransactionRecord::new(fingerprint, exchange_id, request_data, ttl_seconds);
        inner.hash_index.insert(fingerprint.to_string(), key.to_string());
        inner.records.insert(key.to_string(), record);
        true
    }

    async fn update_status(&self, key: &str, status: RunStatus, update: Option<StatusUpdate>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(record) = inner.records.get_mut(key) else { return false };
        record.status = status;
        record.updated_at = chrono::Utc::now();
        if let Some(update) = update {
            record.results.extend(update.results);
            record.errors.extend(update.errors);
            record.error_kinds.extend(update.error_kinds);
            if let Some(retry_count) = update.retry_count {
                record.retry_count = retry_count;
            }
        }
        true
    }

    async fn get_transaction(&self, key: &str) -> Option<TransactionRecord> {
        self.inner.lock().unwrap().records.get(key).cloned()
    }

    async fn get_transactions_by_status(&self, status: RunStatus) -> HashMap<String, TransactionRecord> {
        self.inner
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|(_, record)| record.status == status)
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    async fn release_claim(&self, key: &str, fingerprint: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.hash_index.get(fingerprint).map(String::as_str) == Some(key) {
            inner.hash_index.remove(fingerprint);
        }
        inner.records.remove(key);
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_fingerprint_is_rejected() {
        let store = InMemoryTransactionStore::new();
        let run_id = Uuid::new_v4();
        assert!(store.create_transaction("k1", "fp", run_id, Value::Null, 3600).await);
        assert!(!store.create_transaction("k2", "fp", Uuid::new_v4(), Value::Null, 3600).await);
        assert_eq!(store.check_duplicate("fp").await, Some("k1".to_string()));
    }

    #[tokio::test]
    async fn update_status_merges_results_and_preserves_missing_fields() {
        let store = InMemoryTransactionStore::new();
        let run_id = Uuid::new_v4();
        store.create_transaction("k1", "fp", run_id, Value::Null, 3600).await;

        let mut results = HashMap::new();
        results.insert("payment_url".to_string(), Value::String("https://pay".into()));
        assert!(store.update_status("k1", RunStatus::Running, Some(StatusUpdate::results(results))).await);

        let mut more = HashMap::new();
        more.insert("reference".to_string(), Value::String("ref-1".into()));
        assert!(store.update_status("k1", RunStatus::Completed, Some(StatusUpdate::results(more))).await);

        let record = store.get_transaction("k1").await.unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.results.get("payment_url").unwrap(), "https://pay");
        assert_eq!(record.results.get("reference").unwrap(), "ref-1");
    }

    #[tokio::test]
    async fn update_status_on_unknown_key_fails() {
        let store = InMemoryTransactionStore::new();
        assert!(!store.update_status("missing", RunStatus::Failed, None).await);
    }

    #[tokio::test]
    async fn release_claim_lets_the_fingerprint_be_reclaimed() {
        let store = InMemoryTransactionStore::new();
        let run_id = Uuid::new_v4();
        assert!(store.create_transaction("claim:1", "fp", run_id, Value::Null, 60).await);

        store.release_claim("claim:1", "fp").await;

        assert!(store.check_duplicate("fp").await.is_none());
        assert!(store.get_transaction("claim:1").await.is_none());
        assert!(store.create_transaction("claim:2", "fp", Uuid::new_v4(), Value::Null, 60).await,
                "fingerprint should be claimable again after release");
    }

    #[tokio::test]
    async fn release_claim_on_a_fingerprint_already_reassigned_elsewhere_is_a_noop() {
        let store = InMemoryTransactionStore::new();
        let run_id = Uuid::new_v4();
        store.create_transaction("claim:1", "fp", run_id, Value::Null, 60).await;
        store.release_claim("claim:1", "fp").await;
        store.create_transaction("claim:2", "fp", Uuid::new_v4(), Value::Null, 60).await;

        // A stale release for the first claim must not clobber the second.
        store.release_claim("claim:1", "fp").await;
        assert_eq!(store.check_duplicate("fp").await, Some("claim:2".to_string()));
    }

    #[tokio::test]
    async fn filters_by_status() {
        let store = InMemoryTransactionStore::new();
        store.create_transaction("k1", "fp1", Uuid::new_v4(), Value::Null, 3600).await;
        store.create_transaction("k2", "fp2", Uuid::new_v4(), Value::Null, 3600).await;
        store.update_status("k1", RunStatus::Failed, None).await;

        let failed = store.get_transactions_by_status(RunStatus::Failed).await;
        assert_eq!(failed.len(), 1);
        assert!(failed.contains_key("k1"));
    }
}
