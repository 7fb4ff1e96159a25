//! Engine-level errors for the step engine (C4).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    /// No progress could be made ordering the remaining steps: the
    /// dependency relation is not a DAG.
    #[error("cyclic dependency detected in workflow steps")]
    CyclicDependency,
    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),
    #[error("unknown dependency {dependency} referenced by step {step}")]
    UnknownDependency { step: String, dependency: String },
    #[error("internal: {0}")]
    Internal(String),
}
