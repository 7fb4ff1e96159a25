//! Dispatches launches onto the step engine and tracks each Run to its
//! terminal outcome (C6, §4.5-§4.7). A W-A launch spawns one background
//! task per entry sharing a single `run_id`; a W-B launch spawns exactly
//! one. Either way, callers learn the terminal outcome through a
//! `watch::Receiver` rather than polling the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use flow_adapters::steps::reconciliation::PARAMS_KEY;
use flow_core::correlation;
use flow_core::engine::{StepEngine, WorkflowDefinition};
use flow_core::step::RunContext;
use flow_domain::{ErrorKind, ResultsEnvelope, RunStatus, WorkflowFinishedEvent, WorkflowKind};
use flow_providers::events::EventPublisher;
use flow_store::{StatusUpdate, TransactionStore};
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tracing::{error, warn};
use uuid::Uuid;

use crate::autoscaler::Autoscaler;
use crate::observability;
use crate::registry::WorkflowRegistry;

/// What a caller awaiting a Run's terminal outcome receives.
#[derive(Debug, Clone)]
pub struct RunTerminalNotice {
    pub status: RunStatus,
    pub results: HashMap<String, Value>,
    pub errors: HashMap<String, String>,
}

struct RunAggregate {
    workflow_type: &'static str,
    remaining: usize,
    any_failed: bool,
    results: HashMap<String, Value>,
    errors: HashMap<String, String>,
    error_kinds: HashMap<String, ErrorKind>,
    sender: watch::Sender<Option<RunTerminalNotice>>,
}

pub struct Orchestrator {
    store: Arc<dyn TransactionStore>,
    publisher: Arc<dyn EventPublisher>,
    autoscaler: Arc<Autoscaler>,
    registry: Arc<WorkflowRegistry>,
    runs: Mutex<HashMap<Uuid, RunAggregate>>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn TransactionStore>, publisher: Arc<dyn EventPublisher>, autoscaler: Arc<Autoscaler>,
               registry: Arc<WorkflowRegistry>)
               -> Arc<Self> {
        Arc::new(Self { store, publisher, autoscaler, registry, runs: Mutex::new(HashMap::new()) })
    }

    /// Registers a new Run tracked by `launch_count` in-flight step-engine
    /// executions and returns the receiver its terminal notice arrives on.
    async fn register_run(&self, run_id: Uuid, launch_count: usize, workflow_type: &'static str)
                           -> watch::Receiver<Option<RunTerminalNotice>> {
        let (tx, rx) = watch::channel(None);
        let aggregate = RunAggregate { workflow_type,
                                        remaining: launch_count,
                                        any_failed: false,
                                        results: HashMap::new(),
                                        errors: HashMap::new(),
                                        error_kinds: HashMap::new(),
                                        sender: tx };
        let mut runs = self.runs.lock().await;
        runs.insert(run_id, aggregate);
        observability::set_active_runs(runs.len() as i64);
        rx
    }

    /// Launches `param_values` against `kind`'s workflow, one step-engine
    /// execution per value (§4.4 "W-A spawns one run per entry"). Each
    /// execution runs under its own correlation scope and reports back to
    /// the shared `run_id` aggregate on completion.
    ///
    /// Returns the receiver a caller awaits the terminal outcome on
    /// alongside `launched`, the number of step-engine executions actually
    /// spawned (§4.6 step 7 "count successfully spawned launches"). An
    /// empty `param_values` spawns nothing, registers no aggregate, and
    /// reports `launched = 0` — callers use that to detect the §8 boundary
    /// case ("zero successful launches among new entries") and surface a
    /// startup error instead of leaving the Run stuck unobserved.
    pub async fn launch(self: &Arc<Self>, kind: WorkflowKind, run_id: Uuid, param_values: Vec<Value>)
                         -> (watch::Receiver<Option<RunTerminalNotice>>, usize) {
        let launched = param_values.len();
        if launched == 0 {
            let (_tx, rx) = watch::channel(None);
            return (rx, 0);
        }

        let rx = self.register_run(run_id, launched, kind.as_str()).await;
        let workflow = self.registry.workflow(kind);
        let allow_list = self.registry.allow_list(kind);

        for params in param_values {
            let this = self.clone();
            let workflow = workflow.clone();
            tokio::spawn(correlation::scoped(run_id.to_string(), async move {
                this.run_one(run_id, workflow, allow_list, params).await;
            }));
        }
        (rx, launched)
    }

    async fn run_one(self: Arc<Self>, run_id: Uuid, workflow: Arc<WorkflowDefinition>, allow_list: &'static [&'static str],
                      params: Value) {
        if let Err(err) = self.autoscaler.ensure_capacity(1).await {
            warn!(%run_id, error = %err, "autoscaler capacity check failed, proceeding on existing capacity");
        }

        let workflow_name = workflow.name.clone();
        let payment_methods = payment_methods_of(&params);
        let started = Instant::now();
        let run_id_str = run_id.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut ctx = RunContext::new(run_id_str);
            ctx.set(PARAMS_KEY, params);
            let observer = observability::MetricsStepObserver;
            let engine = StepEngine::new(&observer);
            engine.execute(&workflow, &mut ctx, allow_list)
        }).await;

        observability::record_workflow_duration(&workflow_name, started.elapsed());

        let run_status = match outcome {
            Ok(Ok(run_outcome)) => {
                let status = run_outcome.status;
                self.complete_launch(run_id, status, run_outcome.results, run_outcome.errors, run_outcome.error_kinds)
                    .await;
                status
            }
            Ok(Err(core_err)) => {
                error!(%run_id, error = ?core_err, "step engine rejected workflow definition");
                let mut errors = HashMap::new();
                errors.insert("orchestrator".to_string(), core_err.to_string());
                let mut error_kinds = HashMap::new();
                error_kinds.insert("orchestrator".to_string(), ErrorKind::SystemFatal);
                self.complete_launch(run_id, RunStatus::Failed, HashMap::new(), errors, error_kinds).await;
                RunStatus::Failed
            }
            Err(join_err) => {
                error!(%run_id, error = %join_err, "step engine task panicked or was cancelled");
                let mut errors = HashMap::new();
                errors.insert("orchestrator".to_string(), join_err.to_string());
                let mut error_kinds = HashMap::new();
                error_kinds.insert("orchestrator".to_string(), ErrorKind::SystemFatal);
                self.complete_launch(run_id, RunStatus::Failed, HashMap::new(), errors, error_kinds).await;
                RunStatus::Failed
            }
        };

        let outcome_tag = if run_status == RunStatus::Completed { "completed" } else { "failed" };
        for method in payment_methods {
            observability::record_payment_method_outcome(&method, outcome_tag);
        }
    }

    async fn complete_launch(&self, run_id: Uuid, status: RunStatus, results: HashMap<String, Value>,
                              errors: HashMap<String, String>, error_kinds: HashMap<String, ErrorKind>) {
        let mut runs = self.runs.lock().await;
        let Some(aggregate) = runs.get_mut(&run_id) else {
            error!(%run_id, "completed launch for a run no longer tracked");
            return;
        };

        aggregate.any_failed |= status != RunStatus::Completed;
        aggregate.results.extend(results);
        aggregate.errors.extend(errors);
        aggregate.error_kinds.extend(error_kinds);
        aggregate.remaining = aggregate.remaining.saturating_sub(1);

        if aggregate.remaining > 0 {
            return;
        }

        let final_status = if aggregate.any_failed { RunStatus::Failed } else { RunStatus::Completed };
        let workflow_type = aggregate.workflow_type;
        let key = run_id.to_string();
        let update = StatusUpdate { results: aggregate.results.clone(),
                                     errors: aggregate.errors.clone(),
                                     error_kinds: aggregate.error_kinds.clone(),
                                     retry_count: None };
        if !self.store.update_status(&key, final_status, Some(update)).await {
            error!(%run_id, "final status update failed: run record missing from store");
        }

        let event = WorkflowFinishedEvent { exchange_id: run_id,
                                             workflow_type: workflow_type.to_string(),
                                             timestamp: chrono::Utc::now(),
                                             success: !aggregate.any_failed,
                                             response: (!aggregate.any_failed)
                                                 .then(|| ResultsEnvelope::from_results(aggregate.results.clone())),
                                             error_details: aggregate.any_failed
                                                 .then(|| format!("{:?}", aggregate.errors)),
                                             pdf_content: None };
        self.publisher.publish_terminal(&event).await;

        let notice = RunTerminalNotice { status: final_status,
                                          results: aggregate.results.clone(),
                                          errors: aggregate.errors.clone() };
        let _ = aggregate.sender.send(Some(notice));
        observability::record_run_outcome(workflow_type,
                                           if aggregate.any_failed { "failed" } else { "completed" });

        runs.remove(&run_id);
        observability::set_active_runs(runs.len() as i64);
    }
}

/// Pulls the payment method(s) out of a launch's serialized params, without
/// caring whether it's a W-A [`flow_domain::ReconciliationParams`] (one
/// `form_payment` field) or a W-B [`flow_domain::DeclarationParams`] (an
/// `entries` array, each with its own `form_payment`).
fn payment_methods_of(params: &Value) -> Vec<String> {
    if let Some(method) = params.get("form_payment").and_then(Value::as_str) {
        return vec![method.to_string()];
    }
    params.get("entries")
          .and_then(Value::as_array)
          .map(|entries| {
              entries.iter().filter_map(|entry| entry.get("form_payment")).filter_map(Value::as_str).map(str::to_string).collect()
          })
          .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use flow_domain::DomainError;
    use flow_providers::control_plane::SimulatedHubProbe;
    use flow_store::InMemoryTransactionStore;

    use super::*;
    use crate::autoscaler::Autoscaler;
    use crate::config::AutoscalerConfig;
    use crate::registry::WorkflowRegistry;

    struct NoopControlPlane;
    #[async_trait::async_trait]
    impl flow_providers::control_plane::ControlPlane for NoopControlPlane {
        async fn scale_to(&self, _target_nodes: u32) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn test_orchestrator() -> Arc<Orchestrator> {
        let store: Arc<dyn TransactionStore> = Arc::new(InMemoryTransactionStore::new());
        let driver = Arc::new(flow_adapters::simulated::SimulatedBrowserDriver);
        let registry = Arc::new(WorkflowRegistry::build(driver).unwrap());
        let hub = Arc::new(SimulatedHubProbe::new(1, 0));
        let autoscaler_config = AutoscalerConfig { min_nodes: 1,
                                                    max_nodes: 1,
                                                    sessions_per_node: 1,
                                                    hub_url: "http://localhost:4444".into(),
                                                    idle_timeout_s: 60,
                                                    check_interval_s: 5 };
        let autoscaler = Arc::new(Autoscaler::new(&autoscaler_config, Arc::new(NoopControlPlane), hub));
        let publisher = Arc::new(flow_providers::events::NoopEventPublisher);
        Orchestrator::new(store, publisher, autoscaler, registry)
    }

    #[tokio::test]
    async fn empty_param_values_reports_zero_launches_and_spawns_nothing() {
        let orchestrator = test_orchestrator();
        let run_id = Uuid::new_v4();
        let (_rx, launched) = orchestrator.launch(WorkflowKind::AccountReconciliation, run_id, vec![]).await;
        assert_eq!(launched, 0);
        assert!(orchestrator.runs.lock().await.is_empty(), "no aggregate should be registered for zero launches");
    }

    #[tokio::test]
    async fn non_empty_param_values_reports_matching_launch_count() {
        let orchestrator = test_orchestrator();
        let run_id = Uuid::new_v4();
        let (_rx, launched) =
            orchestrator.launch(WorkflowKind::AccountReconciliation, run_id, vec![serde_json::json!({}), serde_json::json!({})])
                        .await;
        assert_eq!(launched, 2);
    }

    #[test]
    fn payment_methods_of_reads_a_reconciliation_params_single_field() {
        let params = serde_json::json!({"form_payment": "qr", "period_from": "2026-01"});
        assert_eq!(payment_methods_of(&params), vec!["qr".to_string()]);
    }

    #[test]
    fn payment_methods_of_reads_every_declaration_entry() {
        let params = serde_json::json!({"entries": [{"form_payment": "link"}, {"form_payment": "pago_mis_cuentas"}]});
        assert_eq!(payment_methods_of(&params), vec!["link".to_string(), "pago_mis_cuentas".to_string()]);
    }

    #[test]
    fn payment_methods_of_is_empty_for_unrecognized_shapes() {
        assert!(payment_methods_of(&serde_json::json!({})).is_empty());
    }
}
