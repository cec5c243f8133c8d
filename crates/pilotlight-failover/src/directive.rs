//! Operator directives and the response they produce.

use std::fmt;

use pilotlight_state::{FailoverPhase, FailoverState};
use serde::{Deserialize, Serialize};

/// An operator (or scheduler) instruction to the controller.
///
/// Delivery is at-least-once; the controller treats redelivered
/// directives as no-ops rather than re-running a completed sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    /// "failover" or "failback"; anything else is rejected.
    pub action: String,
    /// Region that should end up active.
    #[serde(default)]
    pub target_region: String,
    /// Skip the health/sync preconditions.
    #[serde(default)]
    pub force: bool,
}

impl Directive {
    pub fn failover(target_region: &str, force: bool) -> Self {
        Self {
            action: "failover".to_string(),
            target_region: target_region.to_string(),
            force,
        }
    }

    pub fn failback(target_region: &str, force: bool) -> Self {
        Self {
            action: "failback".to_string(),
            target_region: target_region.to_string(),
            force,
        }
    }
}

/// How the controller disposed of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The state machine advanced.
    Transitioned,
    /// Nothing to do; state and version untouched.
    NoOp,
    /// Invalid or precondition-failing input; no side effects.
    Rejected,
    /// A concurrent invocation advanced the version first.
    Conflict,
    /// A sequence step failed; the state was reverted.
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transitioned => "transitioned",
            Self::NoOp => "no-op",
            Self::Rejected => "rejected",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Response payload for directive execution and health evaluation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveResponse {
    pub outcome: Outcome,
    pub current_state: FailoverPhase,
    pub active_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DirectiveResponse {
    pub fn new(outcome: Outcome, state: &FailoverState) -> Self {
        Self {
            outcome,
            current_state: state.current_state,
            active_region: state.active_region.clone(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
