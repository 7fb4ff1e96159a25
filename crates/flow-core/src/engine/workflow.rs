//! Workflow definitions: named graphs of steps (C5).

use std::collections::{HashMap, HashSet};

use crate::errors::CoreEngineError;
use crate::step::StepDefinition;

pub struct WorkflowDefinition {
    pub name: String,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Result<Self, CoreEngineError> {
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.name.as_str()) {
                return Err(CoreEngineError::DuplicateStepName(step.name.clone()));
            }
        }
        Ok(Self { name: name.into(), steps })
    }

    /// Topological order of step indices. Kahn-style: repeatedly scan the
    /// remaining steps in declaration order and append every step whose
    /// dependencies are already ordered; if a full scan adds nothing, the
    /// dependency relation is not a DAG.
    pub fn execution_order(&self) -> Result<Vec<usize>, CoreEngineError> {
        let name_to_idx: HashMap<&str, usize> =
            self.steps.iter().enumerate().map(|(i, s)| (s.name.as_str(), i)).collect();

        let mut ordered = HashSet::with_capacity(self.steps.len());
        let mut order = Vec::with_capacity(self.steps.len());

        while ordered.len() < self.steps.len() {
            let mut progress = false;
            for (idx, step) in self.steps.iter().enumerate() {
                if ordered.contains(&idx) {
                    continue;
                }
                let deps_satisfied = step.depends_on.iter().all(|dep| {
                    name_to_idx.get(dep.as_str()).is_some_and(|dep_idx| ordered.contains(dep_idx))
                });
                if deps_satisfied {
                    order.push(idx);
                    ordered.insert(idx);
                    progress = true;
                }
            }
            if !progress {
                return Err(CoreEngineError::CyclicDependency);
            }
        }
        Ok(order)
    }

    pub fn step_by_name(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{RunContext, WorkflowStepHandler};
    use flow_domain::DomainError;
    use std::sync::Arc;

    struct NoopHandler;
    impl WorkflowStepHandler for NoopHandler {
        fn run(&self, _ctx: &mut RunContext) -> Result<bool, DomainError> {
            Ok(true)
        }
    }

    fn step(name: &str, depends_on: &[&str]) -> StepDefinition {
        StepDefinition::new(name, Arc::new(NoopHandler)).depends_on(depends_on.to_vec())
    }

    #[test]
    fn linear_order_respects_dependencies() {
        let wf = WorkflowDefinition::new("w", vec![step("b", &["a"]), step("a", &[]), step("c", &["b"])]).unwrap();
        let order = wf.execution_order().unwrap();
        let names: Vec<&str> = order.iter().map(|&i| wf.steps[i].name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_readiness_preserves_declaration_order() {
        let wf = WorkflowDefinition::new("w", vec![step("a", &[]), step("b", &[]), step("c", &[])]).unwrap();
        let order = wf.execution_order().unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn cyclic_dependency_is_rejected() {
        let wf = WorkflowDefinition::new("w", vec![step("a", &["b"]), step("b", &["a"])]).unwrap();
        assert_eq!(wf.execution_order().unwrap_err(), CoreEngineError::CyclicDependency);
    }

    #[test]
    fn duplicate_step_names_rejected_at_construction() {
        let err = WorkflowDefinition::new("w", vec![step("a", &[]), step("a", &[])]).unwrap_err();
        assert_eq!(err, CoreEngineError::DuplicateStepName("a".into()));
    }
}
