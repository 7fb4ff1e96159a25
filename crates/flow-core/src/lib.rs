//! flow-core: the workflow engine (C4), workflow definitions (C5), and
//! fingerprinting (C2) at the heart of the orchestrator.
//!
//! This crate is workflow-agnostic: it knows nothing about tax portals,
//! browsers, or payment methods. Concrete step graphs (W-A, W-B) are built
//! by callers (see `flow-adapters`) out of [`step::WorkflowStepHandler`]
//! implementations and assembled into a [`engine::WorkflowDefinition`].

pub mod constants;
pub mod correlation;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod hashing;
pub mod step;

pub use correlation::current as current_correlation_id;
pub use engine::{NoopObserver, StepEngine, StepEngineOwned, StepObserver, WorkflowDefinition, WorkflowRunOutcome};
pub use errors::CoreEngineError;
pub use fingerprint::{entry_hash, workflow_hash};
pub use step::{RunContext, StepDefinition, WorkflowStepHandler};
