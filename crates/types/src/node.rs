//! Node scheduling options and node-side errors.
//!
//! "Node" is this engine's term for what a decider schedules onto a
//! worker — an HTTP call, a transform, an AI call, an approval gate —
//! driven by an opaque, pluggable handler (§1, "Node business logic ...
//! is out of scope"). The engine cares only that a node starts,
//! completes, or fails.

use serde::{Deserialize, Serialize};

use crate::event::TimeoutConfig;
use crate::retry::RetryPolicy;

/// Options attached to a `NodeScheduled` event: retry policy and
/// per-node timeout budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NodeOptions {
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub timeout: Option<TimeoutConfig>,
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An error reported by a node handler. Carries whether the failure is
/// retryable so History can decide between `NodeFailed { will_retry:
/// true }` (schedule a fresh attempt after the retry-policy delay) and a
/// terminal failure that propagates to the decider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NodeError {
    pub message: String,
    pub retryable: bool,
    pub code: Option<String>,
}

impl NodeError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            code: None,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NodeError {}

impl From<anyhow::Error> for NodeError {
    fn from(err: anyhow::Error) -> Self {
        Self::retryable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_and_non_retryable_constructors() {
        let retryable = NodeError::retryable("timeout");
        assert!(retryable.retryable);
        let fatal = NodeError::non_retryable("bad input").with_code("INVALID_INPUT");
        assert!(!fatal.retryable);
        assert_eq!(fatal.code.as_deref(), Some("INVALID_INPUT"));
    }

    #[test]
    fn node_options_builder() {
        let opts = NodeOptions::new().with_retry_policy(RetryPolicy::no_retry());
        assert_eq!(opts.retry_policy.max_attempts, 1);
    }
}
