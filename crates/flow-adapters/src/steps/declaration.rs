//! W-B ("declaration-upload") step handlers:
//! `login -> open_declaration_form -> upload_entries -> submit* -> generate_payment_voucher*`
//! plus a non-required `attach_qr` (`*` required).

use std::sync::Arc;

use flow_core::step::{RunContext, WorkflowStepHandler};
use flow_domain::{ArtifactPayload, DeclarationParams, DomainError};

use crate::browser::BrowserDriver;

pub const PARAMS_KEY: &str = "params";
pub const REFERENCE_KEY: &str = "reference";
pub const VOUCHER_KEY: &str = "pdf";
pub const QR_KEY: &str = "png";

fn params(ctx: &RunContext) -> Result<DeclarationParams, DomainError> {
    let raw = ctx.get(PARAMS_KEY)
                 .ok_or_else(|| DomainError::SystemFatal("declaration params missing from run context".into()))?;
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

pub struct OpenDeclarationForm(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for OpenDeclarationForm {
    fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
        self.0.open_declaration_form()?;
        Ok(true)
    }
}

pub struct UploadEntries(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for UploadEntries {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let p = params(ctx)?;
        self.0.upload_entries(p.entries.len())?;
        Ok(true)
    }
}

pub struct Submit(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for Submit {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let reference = self.0.submit()?;
        ctx.set(REFERENCE_KEY, serde_json::Value::String(reference));
        Ok(true)
    }
}

pub struct GeneratePaymentVoucher(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for GeneratePaymentVoucher {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let artifact = self.0.generate_payment_voucher()?;
        let payload = ArtifactPayload::new(artifact.filename, artifact.content_type, &artifact.bytes);
        ctx.set(VOUCHER_KEY, serde_json::to_value(payload).map_err(|e| DomainError::SystemFatal(e.to_string()))?);
        Ok(true)
    }
}

pub struct AttachQr(pub Arc<dyn BrowserDriver>);
impl WorkflowStepHandler for AttachQr {
    fn run(&self, ctx: &mut RunContext) -> Result<bool, DomainError> {
        let artifact = self.0.attach_qr()?;
        let payload = ArtifactPayload::new(artifact.filename, artifact.content_type, &artifact.bytes);
        ctx.set(QR_KEY, serde_json::to_value(payload).map_err(|e| DomainError::SystemFatal(e.to_string()))?);
        Ok(true)
    }
}
