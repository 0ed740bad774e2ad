//! Outcome messages posted by the sandbox to its parent.
//!
//! The wire shape is fixed: `{type: "sandbox-success"}` and
//! `{type: "sandbox-error", error: string}`. Documents loaded through a
//! handle URL also attach a numeric `execution` so the controller can tell
//! which execution a message belongs to.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one execution cycle of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(u64);

impl ExecutionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recognised bridge message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    #[serde(rename = "sandbox-success")]
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution: Option<ExecutionId>,
    },

    #[serde(rename = "sandbox-error")]
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution: Option<ExecutionId>,
    },
}

impl BridgeMessage {
    /// Parse a raw message. Anything unrecognised yields `None`.
    pub fn parse(raw: &Value) -> Option<Self> {
        Self::deserialize(raw).ok()
    }

    /// Execution the message claims to come from.
    pub fn execution(&self) -> Option<ExecutionId> {
        match self {
            Self::Success { execution } | Self::Error { execution, .. } => *execution,
        }
    }

    /// Stamp the message as an outcome received at `at`.
    pub fn into_outcome(self, at: DateTime<Utc>) -> ExecutionOutcome {
        match self {
            Self::Success { execution } => ExecutionOutcome {
                execution,
                kind: OutcomeKind::Success,
                at,
            },
            Self::Error { error, execution } => ExecutionOutcome {
                execution,
                kind: OutcomeKind::Error { message: error },
                at,
            },
        }
    }
}

/// Result of running a sandbox document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Error { message: String },
}

/// A terminal outcome as received by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub execution: Option<ExecutionId>,
    pub kind: OutcomeKind,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_legacy_shapes() {
        assert_eq!(
            BridgeMessage::parse(&json!({ "type": "sandbox-success" })),
            Some(BridgeMessage::Success { execution: None })
        );
        assert_eq!(
            BridgeMessage::parse(&json!({ "type": "sandbox-error", "error": "boom" })),
            Some(BridgeMessage::Error {
                error: "boom".to_string(),
                execution: None
            })
        );
    }

    #[test]
    fn parses_correlated_messages() {
        let msg = BridgeMessage::parse(&json!({ "type": "sandbox-success", "execution": 7 })).unwrap();
        assert_eq!(msg.execution(), Some(ExecutionId::new(7)));
    }

    #[test]
    fn ignores_unrecognised_messages() {
        for raw in [
            json!({ "type": "sandbox-ready" }),
            json!({ "type": "sandbox-error" }),
            json!({ "type": "sandbox-error", "error": 42 }),
            json!({ "source": "react-devtools", "payload": {} }),
            json!("sandbox-success"),
            json!(null),
        ] {
            assert_eq!(BridgeMessage::parse(&raw), None, "parsed {raw}");
        }
    }

    #[test]
    fn serializes_bit_exact_shapes() {
        assert_eq!(
            serde_json::to_value(BridgeMessage::Success { execution: None }).unwrap(),
            json!({ "type": "sandbox-success" })
        );
        assert_eq!(
            serde_json::to_value(BridgeMessage::Error {
                error: "x".to_string(),
                execution: None
            })
            .unwrap(),
            json!({ "type": "sandbox-error", "error": "x" })
        );
    }

    #[test]
    fn converts_to_outcome() {
        let at = Utc::now();
        let outcome = BridgeMessage::Error {
            error: "Cannot read properties of undefined".to_string(),
            execution: Some(ExecutionId::new(2)),
        }
        .into_outcome(at);

        assert_eq!(outcome.execution, Some(ExecutionId::new(2)));
        assert_eq!(
            outcome.kind,
            OutcomeKind::Error {
                message: "Cannot read properties of undefined".to_string()
            }
        );
        assert_eq!(outcome.at, at);
    }
}
