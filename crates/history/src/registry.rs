//! Workflow-type registry.
//!
//! History itself never runs decider code — that happens in the Worker
//! (spec.md §4.4) — but it does need to know, per `workflow_type`, the
//! default task queue and timeout budget to apply when a caller starts
//! an execution without specifying its own (spec.md §3 "Lifecycle"
//! implies defaults exist; this is where they're held).

use std::collections::HashMap;

use linkflow_types::{EngineError, Result, TimeoutConfig};

#[derive(Debug, Clone)]
pub struct WorkflowTypeDefaults {
    pub default_task_queue: String,
    pub default_timeout: TimeoutConfig,
}

#[derive(Default)]
pub struct WorkflowTypeRegistry {
    types: HashMap<String, WorkflowTypeDefaults>,
}

impl WorkflowTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, workflow_type: impl Into<String>, defaults: WorkflowTypeDefaults) {
        self.types.insert(workflow_type.into(), defaults);
    }

    pub fn defaults_for(&self, workflow_type: &str) -> Result<&WorkflowTypeDefaults> {
        self.types
            .get(workflow_type)
            .ok_or_else(|| EngineError::InvalidEvent(format!("unregistered workflow type: {workflow_type}")))
    }

    pub fn is_registered(&self, workflow_type: &str) -> bool {
        self.types.contains_key(workflow_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_type_is_rejected() {
        let registry = WorkflowTypeRegistry::new();
        assert!(registry.defaults_for("order_flow").is_err());
    }

    #[test]
    fn registered_type_returns_its_defaults() {
        let mut registry = WorkflowTypeRegistry::new();
        registry.register(
            "order_flow",
            WorkflowTypeDefaults {
                default_task_queue: "workflows-default".into(),
                default_timeout: TimeoutConfig::default(),
            },
        );
        assert!(registry.is_registered("order_flow"));
        assert_eq!(registry.defaults_for("order_flow").unwrap().default_task_queue, "workflows-default");
    }
}
