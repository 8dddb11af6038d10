//! Pluggable workflow deciders: given the current replayed state of a
//! run, produce the `WorkflowCommand`s the decider wants History to
//! apply next (spec.md §4.4 step 3, "run the decider").
//!
//! Workflow business logic — what a given `workflow_type` actually
//! does — is as out of scope for this engine as node business logic
//! (spec.md §1): deciders are registered by the embedding application,
//! keyed by `workflow_type`, the same way `linkflow_worker::handler`
//! registers node handlers by `node_type`.

use std::collections::HashMap;
use std::sync::Arc;

use linkflow_types::{MutableState, WorkflowCommand};
use parking_lot::RwLock;

/// A decider observes the run's current [`MutableState`] (the engine
/// has already replayed history into it) and returns the commands to
/// apply. Implementations are expected to be deterministic functions
/// of `state` alone.
pub trait Decider: Send + Sync {
    fn decide(&self, state: &MutableState) -> Vec<WorkflowCommand>;
}

impl<F> Decider for F
where
    F: Fn(&MutableState) -> Vec<WorkflowCommand> + Send + Sync,
{
    fn decide(&self, state: &MutableState) -> Vec<WorkflowCommand> {
        self(state)
    }
}

#[derive(Default)]
pub struct DeciderRegistry {
    deciders: RwLock<HashMap<String, Arc<dyn Decider>>>,
}

impl DeciderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, workflow_type: impl Into<String>, decider: Arc<dyn Decider>) {
        self.deciders.write().insert(workflow_type.into(), decider);
    }

    pub fn get(&self, workflow_type: &str) -> Option<Arc<dyn Decider>> {
        self.deciders.read().get(workflow_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::WorkflowCommand;
    use serde_json::json;

    #[test]
    fn registered_decider_is_retrievable_by_workflow_type() {
        let registry = DeciderRegistry::new();
        registry.register(
            "order_flow",
            Arc::new(|_state: &MutableState| vec![WorkflowCommand::complete(json!({"done": true}))]),
        );

        let decider = registry.get("order_flow").expect("decider registered");
        let commands = decider.decide(&MutableState::new());
        assert_eq!(commands.len(), 1);
        assert!(commands[0].is_terminal());
        assert!(registry.get("unknown_flow").is_none());
    }
}
