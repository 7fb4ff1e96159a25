//! Intake orchestration (C7, §4.6). One public entrypoint per workflow
//! kind, sharing the claim/dedupe machinery that doesn't depend on the
//! entry type.
//!
//! The dedupe scheme runs at two levels (§8 scenarios 2 and 3, resolved
//! against `TransactionStore::update_status`'s TTL-preserving contract):
//! a short-lived `claim:{run_id}` record arbitrates concurrent submissions
//! of the *same* request at the workflow-fingerprint level, while each
//! entry gets its own long-lived record keyed by its own `entry_hash` so a
//! sequential resubmission after completion still finds, and skips, the
//! entries it already processed. The workflow-level claim is released as
//! soon as intake finishes with it (win or lose) rather than left to expire
//! on its own — the in-memory backend never sweeps TTLs, so an unreleased
//! claim would block every later submission of the same request forever,
//! not just the handful of milliseconds it exists to arbitrate.
//!
//! A Run's own record (keyed by `run_id.to_string()`) stores
//! `request_data` as `{"credentials_id", "entries"}` rather than a bare
//! entry array — never the secret, only the identifier the retry sweeper
//! (`crate::retry`) needs to re-resolve it through the credential resolver
//! when reconstructing params for a relaunch (§4.10).

use std::sync::Arc;

use flow_core::{entry_hash, workflow_hash};
use flow_domain::ttl::{ttl_from_expiration, WORKFLOW_CLAIM_TTL_SECONDS};
use flow_domain::{
    Credentials, DeclarationEntry, DeclarationParams, DomainError, EntryStatus, ExecutionCounts, ExecutionResponse,
    FingerprintFields, ReconciliationEntry, ReconciliationParams, Request, WorkflowKind,
};
use flow_providers::credentials::CredentialResolver;
use flow_store::TransactionStore;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::ApplicationError;
use crate::orchestrator::Orchestrator;

const CLAIM_KEY_PREFIX: &str = "claim:";

pub struct ApplicationService {
    store: Arc<dyn TransactionStore>,
    credential_resolver: Arc<dyn CredentialResolver>,
    orchestrator: Arc<Orchestrator>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn TransactionStore>, credential_resolver: Arc<dyn CredentialResolver>,
               orchestrator: Arc<Orchestrator>)
               -> Self {
        Self { store, credential_resolver, orchestrator }
    }

    pub async fn execute_reconciliation(&self, request: Request<ReconciliationEntry>)
                                         -> Result<ExecutionResponse, ApplicationError> {
        for entry in &request.entries {
            entry.validate()?;
        }

        let run_id = Uuid::new_v4();
        let fingerprint = workflow_hash(request.credentials.identifier(), &request.entries);
        self.claim_workflow(run_id, &fingerprint).await?;
        let result = self.execute_reconciliation_claimed(run_id, request).await;
        self.release_claim(run_id, &fingerprint).await;
        result
    }

    async fn execute_reconciliation_claimed(&self, run_id: Uuid, request: Request<ReconciliationEntry>)
                                             -> Result<ExecutionResponse, ApplicationError> {
        let secret = self.resolve_secret(&request.credentials).await?;
        let credentials = Credentials { cuit: request.credentials.cuit.clone(), password: Some(secret) };

        let (new_entries, processed, duplicates, ttls) = self.dedupe_entries(run_id, request.entries).await?;
        let counts =
            ExecutionCounts { total: processed.len() + duplicates.len(), processed: processed.len(), duplicate: duplicates.len() };

        if new_entries.is_empty() {
            return Ok(ExecutionResponse { run_id: None, processed, duplicates, counts });
        }

        let request_data = serde_json::json!({ "credentials_id": credentials.identifier(), "entries": new_entries });
        self.create_run_record(run_id, &request_data, ttls.into_iter().max().unwrap_or(flow_domain::ttl::DEFAULT_TTL_SECONDS))
            .await?;

        let param_values = new_entries.iter()
                                       .map(|entry| {
                                           serde_json::to_value(ReconciliationParams::new(run_id, credentials.clone(), entry))
                                               .expect("ReconciliationParams always serializes")
                                       })
                                       .collect();
        let (_rx, launched) = self.orchestrator.launch(WorkflowKind::AccountReconciliation, run_id, param_values).await;
        self.require_launched(run_id, launched).await?;

        Ok(ExecutionResponse { run_id: Some(run_id), processed, duplicates, counts })
    }

    pub async fn execute_declaration(&self, request: Request<DeclarationEntry>)
                                      -> Result<ExecutionResponse, ApplicationError> {
        for entry in &request.entries {
            entry.validate()?;
        }

        let run_id = Uuid::new_v4();
        let fingerprint = workflow_hash(request.credentials.identifier(), &request.entries);
        self.claim_workflow(run_id, &fingerprint).await?;
        let result = self.execute_declaration_claimed(run_id, request).await;
        self.release_claim(run_id, &fingerprint).await;
        result
    }

    async fn execute_declaration_claimed(&self, run_id: Uuid, request: Request<DeclarationEntry>)
                                          -> Result<ExecutionResponse, ApplicationError> {
        let secret = self.resolve_secret(&request.credentials).await?;
        let credentials = Credentials { cuit: request.credentials.cuit.clone(), password: Some(secret) };

        let (new_entries, processed, duplicates, ttls) = self.dedupe_entries(run_id, request.entries).await?;
        let counts =
            ExecutionCounts { total: processed.len() + duplicates.len(), processed: processed.len(), duplicate: duplicates.len() };

        if new_entries.is_empty() {
            return Ok(ExecutionResponse { run_id: None, processed, duplicates, counts });
        }

        let request_data = serde_json::json!({ "credentials_id": credentials.identifier(), "entries": new_entries });
        self.create_run_record(run_id, &request_data, ttls.into_iter().max().unwrap_or(flow_domain::ttl::DEFAULT_TTL_SECONDS))
            .await?;

        let params = DeclarationParams::new(run_id, credentials, new_entries);
        let param_values = vec![serde_json::to_value(&params).expect("DeclarationParams always serializes")];
        let (_rx, launched) = self.orchestrator.launch(WorkflowKind::DeclarationUpload, run_id, param_values).await;
        self.require_launched(run_id, launched).await?;

        Ok(ExecutionResponse { run_id: Some(run_id), processed, duplicates, counts })
    }

    /// Claims `fingerprint` for `run_id` under the short-lived claim TTL,
    /// arbitrating two concurrent submissions of the same request (§8
    /// scenario 3). On loss, resolves the winning run_id out of the claim
    /// key it lost to and reports it as a duplicate. Callers release the
    /// claim themselves once past the window it exists to arbitrate —
    /// see [`Self::release_claim`].
    async fn claim_workflow(&self, run_id: Uuid, fingerprint: &str) -> Result<(), ApplicationError> {
        let claim_key = format!("{CLAIM_KEY_PREFIX}{run_id}");
        let claimed = self.store
                           .create_transaction(&claim_key, fingerprint, run_id, serde_json::Value::Null,
                                                WORKFLOW_CLAIM_TTL_SECONDS)
                           .await;
        if claimed {
            return Ok(());
        }

        let existing_exchange_id = match self.store.check_duplicate(fingerprint).await {
            Some(existing_key) => existing_key.strip_prefix(CLAIM_KEY_PREFIX)
                                               .and_then(|id| id.parse::<Uuid>().ok())
                                               .unwrap_or(run_id),
            None => run_id,
        };
        Err(ApplicationError::DuplicateTransaction { transaction_hash: fingerprint.to_string(), existing_exchange_id })
    }

    /// Releases the claim taken by a winning [`Self::claim_workflow`] call.
    /// Run unconditionally once intake is done with `run_id`, success or
    /// failure, so a sequential resubmission of the same request (§8
    /// scenario 2) falls straight through to entry-level dedupe instead of
    /// colliding with a claim whose arbitration window has long since
    /// passed.
    async fn release_claim(&self, run_id: Uuid, fingerprint: &str) {
        let claim_key = format!("{CLAIM_KEY_PREFIX}{run_id}");
        self.store.release_claim(&claim_key, fingerprint).await;
    }

    /// Resolves the secret to actually authenticate with: inline if the
    /// request carried one, otherwise via the configured resolver.
    async fn resolve_secret(&self, credentials: &Credentials) -> Result<String, ApplicationError> {
        if let Some(password) = &credentials.password {
            if !password.trim().is_empty() {
                return Ok(password.clone());
            }
        }
        let secret = self.credential_resolver.resolve(credentials.identifier()).await.map_err(DomainError::from)?;
        Ok(secret)
    }

    /// Splits `entries` into newly-claimed and already-claimed (duplicate)
    /// sets by per-entry fingerprint, and returns the TTL each new entry's
    /// own expiration date implies.
    async fn dedupe_entries<E>(&self, run_id: Uuid, entries: Vec<E>)
                                -> Result<(Vec<E>, Vec<EntryStatus>, Vec<EntryStatus>, Vec<u64>), ApplicationError>
        where E: FingerprintFields + Serialize + Clone
    {
        let mut new_entries = Vec::new();
        let mut processed = Vec::new();
        let mut duplicates = Vec::new();
        let mut ttls = Vec::new();

        for entry in entries {
            let hash = entry_hash(&entry);

            if let Some(existing_key) = self.store.check_duplicate(&hash).await {
                let owner = match self.store.get_transaction(&existing_key).await {
                    Some(record) => record.exchange_id,
                    None => {
                        warn!(entry_hash = %hash, "duplicate claim found but its record is gone, treating as new");
                        self.claim_entry(run_id, &hash, entry, &mut new_entries, &mut processed, &mut duplicates,
                                          &mut ttls)
                            .await?;
                        continue;
                    }
                };
                duplicates.push(EntryStatus { entry_hash: hash, run_id: owner });
                continue;
            }

            self.claim_entry(run_id, &hash, entry, &mut new_entries, &mut processed, &mut duplicates, &mut ttls)
                .await?;
        }

        Ok((new_entries, processed, duplicates, ttls))
    }

    /// Attempts to claim a just-unclaimed entry hash. A loss here means
    /// another caller's `create_transaction` landed between our
    /// `check_duplicate` read and this write — rare, but still reported as
    /// a duplicate rather than silently skipped.
    #[allow(clippy::too_many_arguments)]
    async fn claim_entry<E: FingerprintFields + Serialize + Clone>(&self, run_id: Uuid, hash: &str, entry: E,
                                                                     new_entries: &mut Vec<E>,
                                                                     processed: &mut Vec<EntryStatus>,
                                                                     duplicates: &mut Vec<EntryStatus>,
                                                                     ttls: &mut Vec<u64>)
                                                                     -> Result<(), ApplicationError> {
        let ttl = ttl_from_expiration(entry.expiration_date()?);
        let request_data = serde_json::to_value(&entry).unwrap_or(serde_json::Value::Null);
        let created = self.store.create_transaction(hash, hash, run_id, request_data, ttl).await;
        if created {
            processed.push(EntryStatus { entry_hash: hash.to_string(), run_id });
            new_entries.push(entry);
            ttls.push(ttl);
        } else if let Some(record) = self.store.get_transaction(hash).await {
            duplicates.push(EntryStatus { entry_hash: hash.to_string(), run_id: record.exchange_id });
        } else {
            duplicates.push(EntryStatus { entry_hash: hash.to_string(), run_id });
        }
        Ok(())
    }

    async fn create_run_record(&self, run_id: Uuid, request_data: &serde_json::Value, ttl_seconds: u64)
                                -> Result<(), ApplicationError> {
        let key = run_id.to_string();
        let created = self.store.create_transaction(&key, &key, run_id, request_data.clone(), ttl_seconds).await;
        if created {
            Ok(())
        } else {
            Err(ApplicationError::TransactionCreation)
        }
    }

    /// §4.6 step 8 / §8 boundary case: "zero successful launches among new
    /// entries". Marks the already-created Run record FAILED with a
    /// `workflow_error` entry and rejects the request with a 500-class
    /// startup error instead of handing back a 200 for a Run that will
    /// never be observed moving past CREATED.
    async fn require_launched(&self, run_id: Uuid, launched: usize) -> Result<(), ApplicationError> {
        if launched > 0 {
            return Ok(());
        }
        let key = run_id.to_string();
        let mut errors = std::collections::HashMap::new();
        errors.insert("orchestrator".to_string(), "no workflow launch succeeded for this run".to_string());
        let update = flow_store::StatusUpdate { errors, ..Default::default() };
        self.store.update_status(&key, flow_domain::RunStatus::Failed, Some(update)).await;
        Err(ApplicationError::WorkflowStartup)
    }
}

#[cfg(test)]
mod tests {
    use flow_domain::{DomainError, PaymentMethod, RunStatus};
    use flow_providers::credentials::InlineOnlyCredentialResolver;
    use flow_store::InMemoryTransactionStore;

    use super::*;
    use crate::autoscaler::Autoscaler;
    use crate::config::AutoscalerConfig;
    use crate::registry::WorkflowRegistry;

    fn reconciliation_request(password: &str) -> Request<ReconciliationEntry> {
        Request::new(Credentials { cuit: "20429994323".into(), password: Some(password.to_string()) },
                      vec![ReconciliationEntry { period_from: "01/2023".into(),
                                                  period_to: "12/2025".into(),
                                                  calculation_date: "15/09/2025".into(),
                                                  form_payment: PaymentMethod::Qr,
                                                  expiration_date: "31/12/2025".into(),
                                                  taxpayer_type: None,
                                                  tax_type: None,
                                                  include_interests: false }])
    }

    struct NoopControlPlane;
    #[async_trait::async_trait]
    impl flow_providers::control_plane::ControlPlane for NoopControlPlane {
        async fn scale_to(&self, _target_nodes: u32) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn test_service() -> (Arc<ApplicationService>, Arc<dyn TransactionStore>) {
        let store: Arc<dyn TransactionStore> = Arc::new(InMemoryTransactionStore::new());
        let driver = Arc::new(flow_adapters::simulated::SimulatedBrowserDriver);
        let registry = Arc::new(WorkflowRegistry::build(driver).unwrap());
        let hub = Arc::new(flow_providers::control_plane::SimulatedHubProbe::new(1, 0));
        let autoscaler_config = AutoscalerConfig { min_nodes: 1,
                                                    max_nodes: 1,
                                                    sessions_per_node: 1,
                                                    hub_url: "http://localhost:4444".into(),
                                                    idle_timeout_s: 60,
                                                    check_interval_s: 5 };
        let autoscaler = Arc::new(Autoscaler::new(&autoscaler_config, Arc::new(NoopControlPlane), hub));
        let publisher = Arc::new(flow_providers::events::NoopEventPublisher);
        let orchestrator = Orchestrator::new(store.clone(), publisher, autoscaler, registry);
        let resolver = Arc::new(InlineOnlyCredentialResolver);
        (Arc::new(ApplicationService::new(store.clone(), resolver, orchestrator)), store)
    }

    #[tokio::test]
    async fn pure_new_request_creates_a_run_and_reports_it_processed() {
        let (service, _store) = test_service();
        let response = service.execute_reconciliation(reconciliation_request("hunter2")).await.unwrap();
        assert!(response.run_id.is_some());
        assert_eq!(response.counts.total, 1);
        assert_eq!(response.counts.processed, 1);
        assert_eq!(response.counts.duplicate, 0);
        assert!(response.duplicates.is_empty());
    }

    #[tokio::test]
    async fn entry_level_dedupe_reports_duplicate_against_the_first_run() {
        let (service, _store) = test_service();
        let first = service.execute_reconciliation(reconciliation_request("hunter2")).await.unwrap();
        let first_run_id = first.run_id.unwrap();

        let second = service.execute_reconciliation(reconciliation_request("hunter2")).await.unwrap();
        assert!(second.run_id.is_none(), "second submission finds every entry already claimed");
        assert_eq!(second.counts, ExecutionCounts { total: 1, processed: 0, duplicate: 1 });
        assert_eq!(second.duplicates[0].run_id, first_run_id);
    }

    #[tokio::test]
    async fn sequential_resubmission_of_the_same_request_falls_through_to_entry_dedupe_immediately() {
        // Same scenario as `entry_level_dedupe_reports_duplicate_against_the_first_run`,
        // named for what it guards specifically: without releasing the
        // workflow-level claim this second call would collide on
        // `claim_workflow` and return `DuplicateTransaction`, not a 200
        // with `counts={1,0,1}` (§8 scenario 2).
        let (service, _store) = test_service();
        service.execute_reconciliation(reconciliation_request("hunter2")).await.unwrap();
        let second = service.execute_reconciliation(reconciliation_request("hunter2")).await;
        assert!(second.is_ok(), "expected Ok, got {second:?}");
    }

    #[tokio::test]
    async fn claim_is_released_even_when_the_request_fails_after_claiming() {
        let (service, store) = test_service();
        let fingerprint = flow_core::workflow_hash("20429994323", &reconciliation_request("hunter2").entries);

        // No inline password and `InlineOnlyCredentialResolver` never
        // resolves one, so this fails in `resolve_secret`, after the claim
        // is taken and before the run record is ever created.
        let first = service.execute_reconciliation(reconciliation_request("")).await;
        assert!(first.is_err());
        assert!(store.check_duplicate(&fingerprint).await.is_none(), "failed request must not leave its claim behind");

        let second = service.execute_reconciliation(reconciliation_request("hunter2")).await;
        assert!(second.is_ok(), "a later, valid submission of the same request must not collide on the dead claim");
    }

    #[tokio::test]
    async fn workflow_level_claim_collision_surfaces_as_duplicate_transaction_error() {
        let (service, store) = test_service();
        let request = reconciliation_request("hunter2");
        let fingerprint = flow_core::workflow_hash(request.credentials.identifier(), &request.entries);

        // Simulate a concurrent submission already holding the workflow
        // claim under a different run_id (§8 scenario 3).
        let winner_run_id = Uuid::new_v4();
        let claim_key = format!("claim:{winner_run_id}");
        let claimed =
            store.create_transaction(&claim_key, &fingerprint, winner_run_id, serde_json::Value::Null, 60).await;
        assert!(claimed);

        let err = service.execute_reconciliation(request).await.unwrap_err();
        match err {
            ApplicationError::DuplicateTransaction { existing_exchange_id, .. } => {
                assert_eq!(existing_exchange_id, winner_run_id);
            }
            other => panic!("expected DuplicateTransaction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn require_launched_marks_the_run_failed_when_nothing_was_spawned() {
        let (service, store) = test_service();
        let run_id = Uuid::new_v4();
        let key = run_id.to_string();
        store.create_transaction(&key, &key, run_id, serde_json::json!({}), 3600).await;

        let err = service.require_launched(run_id, 0).await.unwrap_err();
        assert!(matches!(err, ApplicationError::WorkflowStartup));

        let record = store.get_transaction(&key).await.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.errors.contains_key("orchestrator"));
    }

    #[tokio::test]
    async fn require_launched_is_a_noop_when_at_least_one_launch_succeeded() {
        let (service, _store) = test_service();
        assert!(service.require_launched(Uuid::new_v4(), 1).await.is_ok());
    }
}
