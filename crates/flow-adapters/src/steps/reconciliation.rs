//! W-A ("account-reconciliation") step handlers:
//! `login -> navigate_module -> enter_period -> calculate -> {extract_result*, capture_screenshot}`
//! (`*` required). Each handler reads the [`ReconciliationParams`] the
//! orchestrator stashes under `"params"` before the first step runs, and
//! writes its own output back under a results-envelope key.

use std::sync::Arc;

use flow_core::step::{RunContext, WorkflowStepHandler};
use flow_domain::{ArtifactPayload, DomainError, ReconciliationParams};

use crate::browser::BrowserDriver;

pub const PARAMS_KEY: &str = "params";
pub const RESULT_KEY: &str = "result";
pub const SCREENSHOT_KEY: &str = "png";

fn params(ctx: &RunContext) -> Result<ReconciliationParams, DomainError> {
    let raw = ctx.get(PARAMS_KEY)
                 .ok_or_else(|| DomainError::SystemFatal("reconciliation params missing from run context".into()))?;
    serde_json::from_value(raw.clone()).map_err(|e| DomainError::SystemFatal(e.to_string()))
}

pub struct Login(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for Login {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let p = params(ctx)?;
        self.0.login(p.credentials.identifier(), p.credentials.password.as_deref().unwrap_or_default())?;
        Ok(true)
    }
}

pub struct NavigateModule(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for NavigateModule {
    fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
        self.0.navigate_module("account-reconciliation")?;
        Ok(true)
    }
}

pub struct EnterPeriod(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for EnterPeriod {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let p = params(ctx)?;
        self.0.enter_period(&p.period_from, &p.period_to)?;
        Ok(true)
    }
}

pub struct Calculate(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for Calculate {
    fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
        self.0.calculate()?;
        Ok(true)
    }
}

pub struct ExtractResult(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for ExtractResult {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let value = self.0.extract_result()?;
        ctx.set(RESULT_KEY, value);
        Ok(true)
    }
}

pub struct CaptureScreenshot(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for CaptureScreenshot {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let artifact = self.0.capture_screenshot()?;
        let payload = ArtifactPayload::new(artifact.filename, artifact.content_type, &artifact.bytes);
        ctx.set(SCREENSHOT_KEY, serde_json::to_value(payload).map_err(|e| DomainError::SystemFatal(e.to_string()))?);
        Ok(true)
    }
}
