//! The retry sweeper (C11, §4.10): scans the store for `FAILED` runs,
//! keeps the ones classified retryable under `flow_policies::retry`, and
//! relaunches them through the orchestrator.
//!
//! Classification never inspects an error's message (§7/§9) — only the
//! `error_kinds` the step engine recorded alongside it. Reconstructing a
//! relaunch's params has to re-derive a `WorkflowKind` from the stored
//! payload, since a Run's own record doesn't carry its kind explicitly
//! (§9 "dynamic params filtering" drops anything kind-specific before it
//! reaches the store): a payload whose entries carry `period_from` infers
//! W-A, one whose entries carry `fiscal_period`/`form_number` infers W-B.

use std::sync::Arc;

use flow_domain::{
    Credentials, DeclarationEntry, DeclarationParams, ReconciliationEntry, ReconciliationParams, RetryStats, RunStatus,
    WorkflowKind,
};
use flow_policies::retry::evaluate;
use flow_providers::credentials::CredentialResolver;
use flow_store::{StatusUpdate, TransactionRecord, TransactionStore};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::orchestrator::Orchestrator;

pub struct RetrySweeper {
    store: Arc<dyn TransactionStore>,
    credential_resolver: Arc<dyn CredentialResolver>,
    orchestrator: Arc<Orchestrator>,
}

impl RetrySweeper {
    pub fn new(store: Arc<dyn TransactionStore>, credential_resolver: Arc<dyn CredentialResolver>,
               orchestrator: Arc<Orchestrator>)
               -> Arc<Self> {
        Arc::new(Self { store, credential_resolver, orchestrator })
    }

    /// Runs one sweep, returning the stats a `POST /retry` response
    /// reports (§6, §8 scenario 6). `total_found` counts the records the
    /// sweep actually judged eligible for an automatic retry, not every
    /// `FAILED` record it scanned — a record whose budget is exhausted or
    /// whose failure isn't retryable was never a retry candidate.
    pub async fn sweep(&self, max_retries: u32) -> RetryStats {
        let mut stats = RetryStats::default();

        for (key, record) in self.store.get_transactions_by_status(RunStatus::Failed).await {
            let decision = evaluate(&record, max_retries);
            if !decision.eligible {
                continue;
            }
            stats.total_found += 1;

            match self.retry_one(&key, &record).await {
                Ok(()) => {
                    stats.retry_initiated += 1;
                    info!(run_id = %record.exchange_id, retry_count = record.retry_count + 1, "retry initiated");
                }
                Err(err) => {
                    stats.retry_failed += 1;
                    warn!(run_id = %record.exchange_id, error = %err, "retry attempt failed");
                }
            }
        }

        stats
    }

    async fn retry_one(&self, key: &str, record: &TransactionRecord) -> Result<(), String> {
        let run_id = record.exchange_id;
        let (kind, credentials_id, entries) = reconstruct(&record.request_data)?;
        let secret = self.credential_resolver
                          .resolve(&credentials_id)
                          .await
                          .map_err(|e| format!("credential re-resolution failed: {e}"))?;
        let credentials = Credentials { cuit: credentials_id, password: Some(secret) };

        let param_values = match kind {
            WorkflowKind::AccountReconciliation => {
                let entries: Vec<ReconciliationEntry> = serde_json::from_value(Value::Array(entries))
                    .map_err(|e| format!("could not parse stored W-A entries: {e}"))?;
                entries.iter()
                       .map(|entry| {
                           serde_json::to_value(ReconciliationParams::new(run_id, credentials.clone(), entry))
                               .expect("ReconciliationParams always serializes")
                       })
                       .collect()
            }
            WorkflowKind::DeclarationUpload => {
                let entries: Vec<DeclarationEntry> = serde_json::from_value(Value::Array(entries))
                    .map_err(|e| format!("could not parse stored W-B entries: {e}"))?;
                let params = DeclarationParams::new(run_id, credentials, entries);
                vec![serde_json::to_value(&params).expect("DeclarationParams always serializes")]
            }
        };

        let update = StatusUpdate { retry_count: Some(record.retry_count + 1), ..Default::default() };
        if !self.store.update_status(key, RunStatus::Pending, Some(update)).await {
            return Err("update_status(Pending) failed: record no longer present".to_string());
        }

        self.orchestrator.launch(kind, run_id, param_values).await;
        // A relaunch's param_values is never empty (the stored entries list
        // that made it FAILED in the first place is non-empty by
        // construction), so the launched-count is not re-checked here;
        // `require_launched` is an intake-path concern (§4.6 step 8).
        Ok(())
    }
}

/// Splits a Run's stored `{"credentials_id", "entries"}` payload into its
/// credentials identifier, inferred [`WorkflowKind`], and raw entry values.
fn reconstruct(request_data: &Value) -> Result<(WorkflowKind, String, Vec<Value>), String> {
    let credentials_id = request_data.get("credentials_id")
                                      .and_then(Value::as_str)
                                      .ok_or("stored payload is missing credentials_id")?
                                      .to_string();
    let entries = request_data.get("entries")
                               .and_then(Value::as_array)
                               .cloned()
                               .ok_or("stored payload is missing an entries array")?;
    let first = entries.first().ok_or("stored payload has no entries to infer a workflow kind from")?;
    let kind = if first.get("period_from").is_some() {
        WorkflowKind::AccountReconciliation
    } else if first.get("fiscal_period").is_some() || first.get("form_number").is_some() {
        WorkflowKind::DeclarationUpload
    } else {
        return Err("could not infer workflow kind from stored entry shape".to_string());
    };
    Ok((kind, credentials_id, entries))
}
