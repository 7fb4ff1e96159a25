//! Binds each [`WorkflowKind`] to its built [`WorkflowDefinition`] and
//! result allow-list (C5/§4.4). Built once at startup around a shared
//! [`BrowserDriver`] and handed to the orchestrator as an `Arc`.

use std::sync::Arc;

use flow_adapters::browser::BrowserDriver;
use flow_adapters::workflows::{
    build_declaration_workflow, build_reconciliation_workflow, DECLARATION_RESULT_ALLOW_LIST,
    RECONCILIATION_RESULT_ALLOW_LIST,
};
use flow_core::engine::WorkflowDefinition;
use flow_core::errors::CoreEngineError;
use flow_domain::WorkflowKind;

pub struct WorkflowRegistry {
    reconciliation: Arc<WorkflowDefinition>,
    declaration: Arc<WorkflowDefinition>,
}

impl WorkflowRegistry {
    pub fn build(driver: Arc<dyn BrowserDriver>) -> Result<Self, CoreEngineError> {
        let reconciliation = Arc::new(build_reconciliation_workflow(driver.clone())?);
        let declaration = Arc::new(build_declaration_workflow(driver)?);
        Ok(Self { reconciliation, declaration })
    }

    pub fn workflow(&self, kind: WorkflowKind) -> Arc<WorkflowDefinition> {
        match kind {
            WorkflowKind::AccountReconciliation => self.reconciliation.clone(),
            WorkflowKind::DeclarationUpload => self.declaration.clone(),
        }
    }

    pub fn allow_list(&self, kind: WorkflowKind) -> &'static [&'static str] {
        match kind {
            WorkflowKind::AccountReconciliation => RECONCILIATION_RESULT_ALLOW_LIST,
            WorkflowKind::DeclarationUpload => DECLARATION_RESULT_ALLOW_LIST,
        }
    }
}

#[cfg(test)]
mod tests {
    use flow_adapters::simulated::SimulatedBrowserDriver;

    use super::*;

    #[test]
    fn builds_both_kinds_with_matching_allow_lists() {
        let registry = WorkflowRegistry::build(Arc::new(SimulatedBrowserDriver)).unwrap();
        assert_eq!(registry.workflow(WorkflowKind::AccountReconciliation).name, "account-reconciliation");
        assert_eq!(registry.workflow(WorkflowKind::DeclarationUpload).name, "declaration-upload");
        assert!(registry.allow_list(WorkflowKind::AccountReconciliation).contains(&"result"));
        assert!(registry.allow_list(WorkflowKind::DeclarationUpload).contains(&"pdf"));
    }
}
