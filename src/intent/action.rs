//! Live intent instances

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::{Handedness, Vec3};

use super::grid::Cell;

/// Lifecycle state of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    /// Matched, waiting out the minimum duration; no events yet
    Pending,
    /// Confirmed; `start` has been emitted
    Active,
    /// Stopped matching, inside the grace gap
    Ending,
}

/// Why an action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// The pattern stopped holding
    Completed,
    /// The modifier released while the action part still held
    Cancelled,
    /// The hand or the whole frame stream was lost
    Timeout,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the hand an action belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    pub intent_id: String,
    pub hand: Handedness,
    pub hand_index: usize,
}

/// Deterministic action id: `intentId_hand_handIndex_startTimestamp`.
///
/// Timestamps print in their shortest round-trip form, so integral milliseconds print
/// without a fraction (`grab_left_0_1000`).
pub fn action_id(intent_id: &str, hand: Handedness, hand_index: usize, start_ms: f64) -> String {
    format!("{}_{}_{}_{}", intent_id, hand.as_str(), hand_index, start_ms)
}

/// Read-only payload handed to event constructors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    pub action_id: String,
    pub intent_id: String,
    pub hand: Handedness,
    pub hand_index: usize,
    pub position: Vec3,
    pub cell: Cell,
    pub velocity: Vec3,
    pub head_index: Option<usize>,
    /// Time of the frame that produced this context
    pub timestamp: f64,
    /// Milliseconds since the action started
    pub duration: f64,
}

/// One live instance of a matched intent for one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAction {
    pub id: String,
    pub intent_id: String,
    pub state: ActionState,
    pub start_time: f64,
    /// Last frame on which the pattern held
    pub last_update_time: f64,
    pub context: ActionContext,
}

impl ActiveAction {
    pub fn key(&self) -> ActionKey {
        ActionKey {
            intent_id: self.intent_id.clone(),
            hand: self.context.hand,
            hand_index: self.context.hand_index,
        }
    }

    /// Has emitted `start` and will emit `end`
    pub fn is_confirmed(&self) -> bool {
        match self.state {
            ActionState::Pending => false,
            ActionState::Active | ActionState::Ending => true,
        }
    }
}
