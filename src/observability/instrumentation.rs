//! Metrics-recording decorators composed around collaborator trait objects
//! at the composition root (`main.rs`). Keeps `flow-adapters`/`flow-store`
//! themselves free of any metrics-exporter dependency, the same reasoning
//! behind [`super::MetricsStepObserver`] for step outcomes — the concrete
//! exporter stays an implementation detail of the binary, not the crates
//! whose calls it's counting.

use std::sync::Arc;

use async_trait::async_trait;
use flow_adapters::browser::{BrowserArtifact, BrowserDriver};
use flow_domain::{DomainError, RunStatus};
use flow_store::{StatusUpdate, TransactionRecord, TransactionStore};
use serde_json::Value;
use uuid::Uuid;

use std::collections::HashMap;

use super::{record_browser_operation, record_file_operation, record_transaction_operation};

fn outcome_tag(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

/// Wraps a [`BrowserDriver`], recording an `arcaflow_browser_operations_total`
/// sample per call. The three calls that hand back a [`BrowserArtifact`]
/// (later base64-encoded into the results envelope by the step handler
/// that calls them) also record `arcaflow_file_operations_total`, since the
/// driver call itself is where that artifact either does or doesn't
/// materialize.
pub struct InstrumentedBrowserDriver {
    inner: Arc<dyn BrowserDriver>,
}

impl InstrumentedBrowserDriver {
    pub fn new(inner: Arc<dyn BrowserDriver>) -> Self {
        Self { inner }
    }
}

impl BrowserDriver for InstrumentedBrowserDriver {
    fn login(&self, cuit: &str, password: &str) -> Result<(), DomainError> {
        let result = self.inner.login(cuit, password);
        record_browser_operation("login", outcome_tag(result.is_ok()));
        result
    }

    fn navigate_module(&self, module: &str) -> Result<(), DomainError> {
        let result = self.inner.navigate_module(module);
        record_browser_operation("navigate_module", outcome_tag(result.is_ok()));
        result
    }

    fn enter_period(&self, period_from: &str, period_to: &str) -> Result<(), DomainError> {
        let result = self.inner.enter_period(period_from, period_to);
        record_browser_operation("enter_period", outcome_tag(result.is_ok()));
        result
    }

    fn calculate(&self) -> Result<(), DomainError> {
        let result = self.inner.calculate();
        record_browser_operation("calculate", outcome_tag(result.is_ok()));
        result
    }

    fn extract_result(&self) -> Result<Value, DomainError> {
        let result = self.inner.extract_result();
        record_browser_operation("extract_result", outcome_tag(result.is_ok()));
        result
    }

    fn capture_screenshot(&self) -> Result<BrowserArtifact, DomainError> {
        let result = self.inner.capture_screenshot();
        let outcome = outcome_tag(result.is_ok());
        record_browser_operation("capture_screenshot", outcome);
        record_file_operation("screenshot_encode", outcome);
        result
    }

    fn open_declaration_form(&self) -> Result<(), DomainError> {
        let result = self.inner.open_declaration_form();
        record_browser_operation("open_declaration_form", outcome_tag(result.is_ok()));
        result
    }

    fn upload_entries(&self, entry_count: usize) -> Result<(), DomainError> {
        let result = self.inner.upload_entries(entry_count);
        record_browser_operation("upload_entries", outcome_tag(result.is_ok()));
        result
    }

    fn submit(&self) -> Result<String, DomainError> {
        let result = self.inner.submit();
        record_browser_operation("submit", outcome_tag(result.is_ok()));
        result
    }

    fn generate_payment_voucher(&self) -> Result<BrowserArtifact, DomainError> {
        let result = self.inner.generate_payment_voucher();
        let outcome = outcome_tag(result.is_ok());
        record_browser_operation("generate_payment_voucher", outcome);
        record_file_operation("voucher_encode", outcome);
        result
    }

    fn attach_qr(&self) -> Result<BrowserArtifact, DomainError> {
        let result = self.inner.attach_qr();
        let outcome = outcome_tag(result.is_ok());
        record_browser_operation("attach_qr", outcome);
        record_file_operation("qr_encode", outcome);
        result
    }
}

/// Wraps a [`TransactionStore`], recording an
/// `arcaflow_transaction_operations_total` sample per call. `"success"`
/// means the operation found or changed what it was asked to (a claim, a
/// record, a status transition); `"failure"` covers both a lost claim race
/// and a miss against an unknown key, since from this counter's point of
/// view both are "the store had nothing to give this caller".
pub struct InstrumentedTransactionStore {
    inner: Arc<dyn TransactionStore>,
}

impl InstrumentedTransactionStore {
    pub fn new(inner: Arc<dyn TransactionStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TransactionStore for InstrumentedTransactionStore {
    async fn check_duplicate(&self, fingerprint: &str) -> Option<String> {
        let result = self.inner.check_duplicate(fingerprint).await;
        record_transaction_operation("check_duplicate", outcome_tag(result.is_some()));
        result
    }

    async fn create_transaction(&self, key: &str, fingerprint: &str, exchange_id: Uuid, request_data: Value,
                                 ttl_seconds: u64)
                                 -> bool {
        let created = self.inner.create_transaction(key, fingerprint, exchange_id, request_data, ttl_seconds).await;
        record_transaction_operation("create_transaction", outcome_tag(created));
        created
    }

    async fn update_status(&self, key: &str, status: RunStatus, update: Option<StatusUpdate>) -> bool {
        let updated = self.inner.update_status(key, status, update).await;
        record_transaction_operation("update_status", outcome_tag(updated));
        updated
    }

    async fn get_transaction(&self, key: &str) -> Option<TransactionRecord> {
        let result = self.inner.get_transaction(key).await;
        record_transaction_operation("get_transaction", outcome_tag(result.is_some()));
        result
    }

    async fn get_transactions_by_status(&self, status: RunStatus) -> HashMap<String, TransactionRecord> {
        self.inner.get_transactions_by_status(status).await
    }

    async fn release_claim(&self, key: &str, fingerprint: &str) {
        self.inner.release_claim(key, fingerprint).await;
        record_transaction_operation("release_claim", "success");
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use flow_domain::DomainError;

    use super::*;

    struct StubDriver;
    impl BrowserDriver for StubDriver {
        fn login(&self, cuit: &str, _password: &str) -> Result<(), DomainError> {
            if cuit.is_empty() {
                return Err(DomainError::BusinessRule("empty cuit".into()));
            }
            Ok(())
        }
        fn navigate_module(&self, _module: &str) -> Result<(), DomainError> {
            Ok(())
        }
        fn enter_period(&self, _period_from: &str, _period_to: &str) -> Result<(), DomainError> {
            Ok(())
        }
        fn calculate(&self) -> Result<(), DomainError> {
            Ok(())
        }
        fn extract_result(&self) -> Result<Value, DomainError> {
            Ok(Value::Null)
        }
        fn capture_screenshot(&self) -> Result<BrowserArtifact, DomainError> {
            Ok(BrowserArtifact { filename: "s.png".into(), content_type: "image/png".into(), bytes: vec![] })
        }
        fn open_declaration_form(&self) -> Result<(), DomainError> {
            Ok(())
        }
        fn upload_entries(&self, _entry_count: usize) -> Result<(), DomainError> {
            Ok(())
        }
        fn submit(&self) -> Result<String, DomainError> {
            Ok("ref".into())
        }
        fn generate_payment_voucher(&self) -> Result<BrowserArtifact, DomainError> {
            Ok(BrowserArtifact { filename: "v.pdf".into(), content_type: "application/pdf".into(), bytes: vec![] })
        }
        fn attach_qr(&self) -> Result<BrowserArtifact, DomainError> {
            Ok(BrowserArtifact { filename: "q.png".into(), content_type: "image/png".into(), bytes: vec![] })
        }
    }

    #[test]
    fn instrumented_driver_forwards_results_unchanged() {
        let driver = InstrumentedBrowserDriver::new(Arc::new(StubDriver));
        assert!(driver.login("20429994323", "x").is_ok());
        assert!(driver.login("", "x").is_err());
        assert!(driver.capture_screenshot().is_ok());
    }

    #[tokio::test]
    async fn instrumented_store_forwards_results_unchanged() {
        use flow_store::InMemoryTransactionStore;

        let store = InstrumentedTransactionStore::new(Arc::new(InMemoryTransactionStore::new()));
        let run_id = Uuid::new_v4();
        assert!(store.create_transaction("k", "fp", run_id, Value::Null, 60).await);
        assert!(!store.create_transaction("k2", "fp", Uuid::new_v4(), Value::Null, 60).await);
        assert_eq!(store.check_duplicate("fp").await, Some("k".to_string()));
        assert!(store.get_transaction("k").await.is_some());
        assert!(store.get_transaction("missing").await.is_none());
        store.release_claim("k", "fp").await;
        assert!(store.check_duplicate("fp").await.is_none());
    }
}
