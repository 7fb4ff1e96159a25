//! Step handler contract and the declarative per-step configuration the
//! engine schedules against.
//!
//! Handlers are synchronous and may block for seconds or minutes (browser
//! automation); the engine runs the whole workflow on a dedicated worker
//! thread, never on the async scheduler driving intake/monitor tasks.

use std::sync::Arc;

use flow_domain::DomainError;

use super::context::RunContext;

pub trait WorkflowStepHandler: Send + Sync {
    /// Runs the step. `Ok(true)` is success, `Ok(false)` is a non-raising
    /// failure (eligible for retry same as an `Err`), `Err` carries the
    /// failure for downstream classification.
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError>;
}

pub struct StepDefinition {
    pub name: String,
    pub depends_on: Vec<String>,
    pub required: bool,
    pub retry_count: u32,
    pub timeout_seconds: u64,
    pub handler: Arc<dyn WorkflowStepHandler>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, handler: Arc<dyn WorkflowStepHandler>) -> Self {
        Self { name: name.into(),
               depends_on: Vec::new(),
               required: true,
               retry_count: crate::constants::DEFAULT_STEP_RETRY_COUNT,
               timeout_seconds: crate::constants::DEFAULT_STEP_TIMEOUT_SECONDS,
               handler }
    }

    pub fn depends_on(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}
