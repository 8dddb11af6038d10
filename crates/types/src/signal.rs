//! External signals delivered to running executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowSignal {
    pub signal_type: String,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

impl WorkflowSignal {
    pub fn new(signal_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            signal_type: signal_type.into(),
            payload,
            sent_at: Utc::now(),
        }
    }

    pub fn cancel(reason: impl Into<String>) -> Self {
        Self::new(
            signal_types::CANCEL,
            serde_json::json!({ "reason": reason.into() }),
        )
    }

    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(name, payload)
    }

    pub fn is_cancel(&self) -> bool {
        self.signal_type == signal_types::CANCEL
    }
}

pub mod signal_types {
    /// Request execution cancellation (the decider observes this on its
    /// next workflow task and emits a terminal event).
    pub const CANCEL: &str = "cancel";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_signal_round_trips() {
        let signal = WorkflowSignal::cancel("operator requested");
        assert!(signal.is_cancel());
        let json = serde_json::to_string(&signal).unwrap();
        let parsed: WorkflowSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal.signal_type, parsed.signal_type);
    }

    #[test]
    fn custom_signal_is_not_cancel() {
        let signal = WorkflowSignal::custom("order_updated", serde_json::json!({"status": "shipped"}));
        assert!(!signal.is_cancel());
    }
}
