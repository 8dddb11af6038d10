//! The decider-level error type carried on `ExecutionFailed` and
//! `WorkflowTaskFailed` events.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowError {
    pub message: String,
    pub retryable: bool,
    pub code: Option<String>,
}

impl WorkflowError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            code: None,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkflowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_non_retryable() {
        let err = WorkflowError::new("boom");
        assert!(!err.retryable);
    }

    #[test]
    fn retryable_constructor_sets_flag() {
        let err = WorkflowError::retryable("transient");
        assert!(err.retryable);
    }

    #[test]
    fn with_code_attaches_code() {
        let err = WorkflowError::new("boom").with_code("BOOM");
        assert_eq!(err.code.as_deref(), Some("BOOM"));
    }
}
