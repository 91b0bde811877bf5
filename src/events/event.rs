//! Outbound intent events

use serde::{Deserialize, Serialize};

use crate::{
    frame::{Handedness, Vec3},
    intent::{ActionContext, Cell, EndReason},
};

/// Lifecycle phase carried in the event type suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    Start,
    Update,
    End,
}

impl EventPhase {
    pub const ALL: [EventPhase; 3] = [EventPhase::Start, EventPhase::Update, EventPhase::End];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Update => "update",
            Self::End => "end",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.suffix() == suffix)
    }
}

/// `"<intentId>:<phase>"`
pub fn event_type(intent_id: &str, phase: EventPhase) -> String {
    format!("{}:{}", intent_id, phase.suffix())
}

/// Split an event type into intent id and phase
pub fn parse_event_type(event_type: &str) -> Option<(&str, EventPhase)> {
    let (intent_id, suffix) = event_type.rsplit_once(':')?;
    Some((intent_id, EventPhase::from_suffix(suffix)?))
}

/// One lifecycle event of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub phase: EventPhase,
    /// Action id
    pub id: String,
    pub intent_id: String,
    pub timestamp: f64,
    pub position: Vec3,
    pub cell: Cell,
    pub hand: Handedness,
    pub hand_index: usize,
    pub head_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec3>,
    /// Milliseconds since start; absent on `start`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Present only on `end`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EndReason>,
}

impl IntentEvent {
    fn from_context(phase: EventPhase, ctx: &ActionContext) -> Self {
        Self {
            event_type: event_type(&ctx.intent_id, phase),
            phase,
            id: ctx.action_id.clone(),
            intent_id: ctx.intent_id.clone(),
            timestamp: ctx.timestamp,
            position: ctx.position,
            cell: ctx.cell,
            hand: ctx.hand,
            hand_index: ctx.hand_index,
            head_index: ctx.head_index,
            velocity: Some(ctx.velocity),
            duration: match phase {
                EventPhase::Start => None,
                EventPhase::Update | EventPhase::End => Some(ctx.duration),
            },
            reason: None,
        }
    }

    pub fn start(ctx: &ActionContext) -> Self {
        Self::from_context(EventPhase::Start, ctx)
    }

    pub fn update(ctx: &ActionContext) -> Self {
        Self::from_context(EventPhase::Update, ctx)
    }

    pub fn end(ctx: &ActionContext, reason: EndReason) -> Self {
        let mut event = Self::from_context(EventPhase::End, ctx);
        event.reason = Some(reason);
        event
    }
}
