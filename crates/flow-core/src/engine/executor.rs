//! The step engine (C4): executes a [`WorkflowDefinition`] in topological
//! order with per-step retries, skip-on-failed-required-dependency, and
//! partial-failure semantics.
//!
//! Handlers are synchronous and may block for seconds or minutes (browser
//! automation); callers are expected to run [`StepEngine::execute`] on a
//! dedicated worker thread (e.g. `tokio::task::spawn_blocking`), never on
//! the scheduler driving intake/monitor tasks.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use flow_domain::{DomainError, ErrorKind, RunStatus, StepStatus};
use serde_json::Value;

use super::observer::{NoopObserver, StepObserver, StepOutcome as ObservedOutcome};
use super::workflow::WorkflowDefinition;
use crate::errors::CoreEngineError;
use crate::step::RunContext;

/// The interval the engine sleeps between retry attempts (§4.3 step 4).
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
    pub duration: Duration,
    pub attempts: u32,
    /// Classification of the last attempt's failure, if any. Carried
    /// alongside the stringified message so a persisted record can be
    /// classified for retry eligibility without parsing error text (§7, §9).
    pub error_kind: Option<ErrorKind>,
}

/// Result of running one [`WorkflowDefinition`] to completion (or to its
/// first fatal required-step failure).
#[derive(Debug, Clone)]
pub struct WorkflowRunOutcome {
    pub status: RunStatus,
    pub results: HashMap<String, Value>,
    pub errors: HashMap<String, String>,
    /// Same keys as `errors`, carrying each failed step's [`ErrorKind`]
    /// instead of its message — the retry sweeper's classification input.
    pub error_kinds: HashMap<String, ErrorKind>,
    pub step_outcomes: Vec<StepOutcome>,
}

pub struct StepEngine<'a> {
    observer: &'a dyn StepObserver,
}

impl<'a> StepEngine<'a> {
    pub fn new(observer: &'a dyn StepObserver) -> Self {
        Self { observer }
    }

    pub fn with_noop_observer() -> StepEngineOwned {
        StepEngineOwned { observer: NoopObserver }
    }

    /// Executes every step of `workflow` against `ctx`, copying the
    /// `allow_list` keys from the shared resource bag into `results` on
    /// exit. `ctx` is cleaned up unconditionally, including on cyclic
    /// dependency failure.
    pub fn execute(&self, workflow: &WorkflowDefinition, ctx: &mut RunContext, allow_list: &[&str])
                    -> Result<WorkflowRunOutcome, CoreEngineError> {
        let order = match workflow.execution_order() {
            Ok(order) => order,
            Err(e) => {
                ctx.cleanup();
                return Err(e);
            }
        };

        let mut statuses: HashMap<&str, StepStatus> = HashMap::new();
        let mut step_outcomes = Vec::with_capacity(order.len());
        let mut errors = HashMap::new();
        let mut error_kinds = HashMap::new();
        let mut aborted = false;

        for idx in order {
            let step = &workflow.steps[idx];

            if aborted {
                statuses.insert(step.name.as_str(), StepStatus::Pending);
                continue;
            }

            let blocked_by_failed_required_dep = step.depends_on.iter().any(|dep| {
                let dep_step = workflow.step_by_name(dep);
                let dep_required = dep_step.is_some_and(|s| s.required);
                dep_required && matches!(statuses.get(dep.as_str()), Some(StepStatus::Failed))
            });

            if blocked_by_failed_required_dep {
                statuses.insert(step.name.as_str(), StepStatus::Skipped);
                step_outcomes.push(StepOutcome { name: step.name.clone(),
                                                  status: StepStatus::Skipped,
                                                  duration: Duration::ZERO,
                                                  attempts: 0,
                                                  error_kind: None });
                self.observer.on_step(&workflow.name, &step.name, ObservedOutcome::Skipped, Duration::ZERO);
                continue;
            }

            let attempts_total = step.retry_count.max(1);
            let started = Instant::now();
            let mut attempts_used = 0;
            let mut last_err: Option<DomainError> = None;
            let mut succeeded = false;

            for attempt in 0..attempts_total {
                attempts_used = attempt + 1;
                let outcome = step.handler.run(ctx);
                match outcome {
                    Ok(true) => {
                        succeeded = true;
                        last_err = None;
                        break;
                    }
                    Ok(false) => {
                        last_err = Some(DomainError::BusinessRule(format!("step {} returned false", step.name)));
                    }
                    Err(e) => {
                        last_err = Some(e);
                    }
                }
                let is_last_attempt = attempt + 1 >= attempts_total;
                if is_last_attempt {
                    break;
                }
                self.observer.on_step(&workflow.name, &step.name, ObservedOutcome::Retry, started.elapsed());
                thread::sleep(RETRY_BACKOFF);
            }

            let duration = started.elapsed();
            let status = if succeeded { StepStatus::Completed } else { StepStatus::Failed };
            let error_kind = last_err.as_ref().map(|e| e.kind());
            statuses.insert(step.name.as_str(), status);
            step_outcomes.push(StepOutcome { name: step.name.clone(), status, duration, attempts: attempts_used,
                                              error_kind });

            if succeeded {
                self.observer.on_step(&workflow.name, &step.name, ObservedOutcome::Success, duration);
            } else {
                self.observer.on_step(&workflow.name, &step.name, ObservedOutcome::Failed, duration);
                if let Some(e) = &last_err {
                    errors.insert(step.name.clone(), e.to_string());
                    error_kinds.insert(step.name.clone(), e.kind());
                }
                if step.required {
                    aborted = true;
                }
            }
        }

        let any_required_failed =
            statuses.iter().any(|(name, status)| {
                             matches!(status, StepStatus::Failed)
                                 && workflow.step_by_name(name).is_some_and(|s| s.required)
                         });
        let final_status = if any_required_failed { RunStatus::Failed } else { RunStatus::Completed };
        let results = ctx.take_allowed(allow_list);
        ctx.cleanup();

        Ok(WorkflowRunOutcome { status: final_status, results, errors, error_kinds, step_outcomes })
    }
}

/// Owned convenience wrapper so callers that don't want to juggle a
/// borrowed observer reference can use `StepEngine::with_noop_observer()`.
pub struct StepEngineOwned {
    observer: NoopObserver,
}

impl StepEngineOwned {
    pub fn execute(&self, workflow: &WorkflowDefinition, ctx: &mut RunContext, allow_list: &[&str])
                    -> Result<WorkflowRunOutcome, CoreEngineError> {
        StepEngine::new(&self.observer).execute(workflow, ctx, allow_list)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::step::{StepDefinition, WorkflowStepHandler};

    struct AlwaysOk;
    impl WorkflowStepHandler for AlwaysOk {
        fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
            Ok(true)
        }
    }

    struct AlwaysFails;
    impl WorkflowStepHandler for AlwaysFails {
        fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
            Err(DomainError::TransientInfrastructure("boom".into()))
        }
    }

    struct SucceedsOnAttempt {
        succeed_at: u32,
        calls: Arc<AtomicU32>,
    }
    impl WorkflowStepHandler for SucceedsOnAttempt {
        fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_at {
                Ok(true)
            } else {
                Err(DomainError::TransientInfrastructure("not yet".into()))
            }
        }
    }

    struct SetsResource(&'static str, &'static str);
    impl WorkflowStepHandler for SetsResource {
        fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
            ctx.set(self.0, Value::String(self.1.to_string()));
            Ok(true)
        }
    }

    #[test]
    fn all_required_steps_succeed_yields_completed() {
        let wf = WorkflowDefinition::new("w", vec![StepDefinition::new("a", Arc::new(AlwaysOk)),
                                                    StepDefinition::new("b", Arc::new(AlwaysOk)).depends_on(["a"]),])
            .unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &[]).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn required_step_failure_aborts_remaining_steps() {
        let wf = WorkflowDefinition::new("w", vec![
            StepDefinition::new("a", Arc::new(AlwaysFails)).retry_count(1),
            StepDefinition::new("b", Arc::new(AlwaysOk)).depends_on(["a"]),
        ]).unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &[]).unwrap();
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.errors.contains_key("a"));
        // "b" never got a chance to run/complete.
        let b_outcome = outcome.step_outcomes.iter().find(|s| s.name == "b").unwrap();
        assert_eq!(b_outcome.status, StepStatus::Pending);
    }

    #[test]
    fn non_required_step_failure_is_recorded_but_not_fatal() {
        let wf = WorkflowDefinition::new("w", vec![
            StepDefinition::new("a", Arc::new(AlwaysFails)).retry_count(1).required(false),
            StepDefinition::new("b", Arc::new(AlwaysOk)),
        ]).unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &[]).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert!(outcome.errors.contains_key("a"));
    }

    #[test]
    fn dependent_step_is_skipped_when_required_dependency_failed() {
        let wf = WorkflowDefinition::new("w", vec![
            StepDefinition::new("a", Arc::new(AlwaysFails)).retry_count(1).required(false),
            StepDefinition::new("b", Arc::new(AlwaysOk)).depends_on(["a"]),
        ]).unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &[]).unwrap();
        // "a" is non-required, so its failure does not abort the run, but
        // "b" still depends on a step that failed and is skipped.
        let b_outcome = outcome.step_outcomes.iter().find(|s| s.name == "b").unwrap();
        assert_eq!(b_outcome.status, StepStatus::Skipped);
    }

    #[test]
    fn exhausted_retries_then_failure_retries_succeed_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let wf = WorkflowDefinition::new("w",
                                          vec![StepDefinition::new("a",
                                                                    Arc::new(SucceedsOnAttempt { succeed_at: 2,
                                                                                                  calls:
                                                                                                      calls.clone() }))
                                                   .retry_count(3)]).unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &[]).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cyclic_dependency_fails_before_any_step_runs() {
        let wf = WorkflowDefinition::new("w", vec![StepDefinition::new("a", Arc::new(AlwaysOk)).depends_on(["b"]),
                                                    StepDefinition::new("b", Arc::new(AlwaysOk)).depends_on(["a"]),])
            .unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let err = engine.execute(&wf, &mut ctx, &[]).unwrap_err();
        assert_eq!(err, CoreEngineError::CyclicDependency);
    }

    #[test]
    fn failed_step_error_kind_is_classified_without_parsing_the_message() {
        let wf = WorkflowDefinition::new("w", vec![StepDefinition::new("a", Arc::new(AlwaysFails)).retry_count(1)])
            .unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &[]).unwrap();
        assert_eq!(outcome.error_kinds.get("a"), Some(&flow_domain::ErrorKind::TransientInfrastructure));
        let a_outcome = outcome.step_outcomes.iter().find(|s| s.name == "a").unwrap();
        assert_eq!(a_outcome.error_kind, Some(flow_domain::ErrorKind::TransientInfrastructure));
    }

    #[test]
    fn results_surfacing_is_restricted_to_allow_list() {
        let wf = WorkflowDefinition::new("w",
                                          vec![StepDefinition::new("a",
                                                                    Arc::new(SetsResource("payment_url",
                                                                                           "https://pay"))),]).unwrap();
        let mut ctx = RunContext::new("run-1");
        let engine = StepEngine::with_noop_observer();
        let outcome = engine.execute(&wf, &mut ctx, &["payment_url"]).unwrap();
        assert_eq!(outcome.results.get("payment_url").unwrap(), "https://pay");
        assert!(ctx.get("payment_url").is_none(), "cleanup must clear the resource bag");
    }
}
