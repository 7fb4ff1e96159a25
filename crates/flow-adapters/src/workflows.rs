//! Concrete workflow graphs (C5) for the two kinds this core ships:
//! W-A ("account-reconciliation") and W-B ("declaration-upload"). See
//! §4.4 for the step graphs; adding a new kind is exactly this shape —
//! a named factory function returning a [`WorkflowDefinition`].

use std::sync::Arc;

use flow_core::engine::WorkflowDefinition;
use flow_core::errors::CoreEngineError;
use flow_core::step::StepDefinition;

use crate::browser::BrowserDriver;
use crate::steps::declaration;
use crate::steps::reconciliation;

pub const RECONCILIATION_WORKFLOW_NAME: &str = "account-reconciliation";
pub const DECLARATION_WORKFLOW_NAME: &str = "declaration-upload";

/// `login -> navigate_module -> enter_period -> calculate -> {extract_result*, capture_screenshot}`.
pub fn build_reconciliation_workflow(driver: Arc<dyn BrowserDriver>) -> Result<WorkflowDefinition, CoreEngineError> {
    WorkflowDefinition::new(RECONCILIATION_WORKFLOW_NAME,
                             vec![StepDefinition::new("login", Arc::new(reconciliation::Login(driver.clone()))),
                                  StepDefinition::new("navigate_module",
                                                       Arc::new(reconciliation::NavigateModule(driver.clone())))
                                      .depends_on(["login"]),
                                  StepDefinition::new("enter_period",
                                                       Arc::new(reconciliation::EnterPeriod(driver.clone())))
                                      .depends_on(["navigate_module"]),
                                  StepDefinition::new("calculate", Arc::new(reconciliation::Calculate(driver.clone())))
                                      .depends_on(["enter_period"]),
                                  StepDefinition::new("extract_result",
                                                       Arc::new(reconciliation::ExtractResult(driver.clone())))
                                      .depends_on(["calculate"])
                                      .required(true),
                                  StepDefinition::new("capture_screenshot",
                                                       Arc::new(reconciliation::CaptureScreenshot(driver)))
                                      .depends_on(["calculate"])
                                      .required(false),])
}

/// `login -> open_declaration_form -> upload_entries -> submit* -> generate_payment_voucher*`
/// plus a non-required `attach_qr`.
pub fn build_declaration_workflow(driver: Arc<dyn BrowserDriver>) -> Result<WorkflowDefinition, CoreEngineError> {
    WorkflowDefinition::new(DECLARATION_WORKFLOW_NAME,
                             vec![StepDefinition::new("login", Arc::new(declaration::Login(driver.clone()))),
                                  StepDefinition::new("open_declaration_form",
                                                       Arc::new(declaration::OpenDeclarationForm(driver.clone())))
                                      .depends_on(["login"]),
                                  StepDefinition::new("upload_entries",
                                                       Arc::new(declaration::UploadEntries(driver.clone())))
                                      .depends_on(["open_declaration_form"]),
                                  StepDefinition::new("submit", Arc::new(declaration::Submit(driver.clone())))
                                      .depends_on(["upload_entries"])
                                      .required(true),
                                  StepDefinition::new("generate_payment_voucher",
                                                       Arc::new(declaration::GeneratePaymentVoucher(driver.clone())))
                                      .depends_on(["submit"])
                                      .required(true),
                                  StepDefinition::new("attach_qr", Arc::new(declaration::AttachQr(driver)))
                                      .depends_on(["generate_payment_voucher"])
                                      .required(false),])
}

/// Allow-lists the step engine uses to surface shared-resource keys into a
/// Run's public `results` — kept next to the workflow that produces them.
pub const RECONCILIATION_RESULT_ALLOW_LIST: &[&str] = &[reconciliation::RESULT_KEY, reconciliation::SCREENSHOT_KEY];
pub const DECLARATION_RESULT_ALLOW_LIST: &[&str] =
    &[declaration::REFERENCE_KEY, declaration::VOUCHER_KEY, declaration::QR_KEY];
