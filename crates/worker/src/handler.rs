//! Pluggable node handlers: given an activity task's input, execute the
//! node and return its result (spec.md §4.4 step 4, "look up the
//! node-type handler; execute").
//!
//! Node business logic (HTTP calls, email, AI calls) is explicitly out
//! of scope for this engine (spec.md §1): handlers are opaque functions
//! registered by `node_type`, mirroring the teacher's
//! `WorkerPool::register_handler` pattern.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use linkflow_types::NodeError;
use parking_lot::RwLock;

/// The input an activity task's handler is invoked with: the node's
/// input payload plus addressing context a handler may want to log.
#[derive(Debug, Clone)]
pub struct NodeTask {
    pub node_id: String,
    pub node_type: String,
    pub attempt: u32,
    pub input: serde_json::Value,
}

pub type NodeHandlerResult = Result<serde_json::Value, NodeError>;

pub type NodeHandler = Arc<
    dyn Fn(NodeTask) -> Pin<Box<dyn Future<Output = NodeHandlerResult> + Send>> + Send + Sync,
>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, NodeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&self, node_type: impl Into<String>, handler: F)
    where
        F: Fn(NodeTask) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NodeHandlerResult> + Send + 'static,
    {
        let handler: NodeHandler = Arc::new(move |task| Box::pin(handler(task)));
        self.handlers.write().insert(node_type.into(), handler);
    }

    pub fn get(&self, node_type: &str) -> Option<NodeHandler> {
        self.handlers.read().get(node_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_handler_executes_and_is_retrievable_by_node_type() {
        let registry = HandlerRegistry::new();
        registry.register("http_call", |task: NodeTask| async move {
            Ok(serde_json::json!({"echo": task.input}))
        });

        let handler = registry.get("http_call").expect("handler registered");
        let result = handler(NodeTask {
            node_id: "n1".into(),
            node_type: "http_call".into(),
            attempt: 1,
            input: serde_json::json!({"url": "https://example.com"}),
        })
        .await
        .unwrap();
        assert_eq!(result["echo"]["url"], "https://example.com");
        assert!(registry.get("unknown_type").is_none());
    }
}
