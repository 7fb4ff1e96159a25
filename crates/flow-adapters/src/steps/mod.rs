//! Concrete `WorkflowStepHandler` implementations for each workflow kind.

pub mod declaration;
pub mod reconciliation;
