//! Step declarations: the handler contract, the per-step configuration,
//! and the shared resource bag steps communicate through.

mod context;
mod definition;

pub use context::RunContext;
pub use definition::{StepDefinition, WorkflowStepHandler};
pub use flow_domain::StepStatus;
