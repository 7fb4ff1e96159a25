//! The step engine (C4) and workflow definitions (C5): a topologically
//! ordered executor for named graphs of steps, with retries, skip-on-
//! failed-required-dependency, and partial-failure semantics.

pub mod executor;
pub mod observer;
pub mod workflow;

pub use executor::{StepEngine, StepEngineOwned, StepOutcome, WorkflowRunOutcome, RETRY_BACKOFF};
pub use observer::{NoopObserver, StepObserver, StepOutcome as ObservedStepOutcome};
pub use workflow::WorkflowDefinition;
