//! Action lifecycle state machine
//!
//! ```text
//!            match                 held >= minDuration
//!   (none) ─────────► Pending ───────────────────────► Active ──┐ match: update
//!                       │ no match: dropped, silent      ▲  │ ◄─┘
//!                       ▼                     match      │  │ no match
//!                                        ┌───────────────┘  ▼
//!                                        └──────────── Ending ── gap > maxGap ──► end
//! ```

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace};

use crate::{
    events::IntentEvent,
    frame::{landmarks, FrameSnapshot, RawHandDetection},
    history::{FrameHistory, HandSelector},
    pattern::{
        matcher::{gesture_holds, matches_in_history, pinch_holds},
        HandMatch, PatternDef,
    },
};

use super::{
    action::{action_id, ActionContext, ActionKey, ActionState, ActiveAction, EndReason},
    def::Intent,
    grid::GridConfig,
};

/// Default window for reported velocity
pub const DEFAULT_VELOCITY_WINDOW_MS: f64 = 100.0;

/// Everything the tracker needs to know about one tick
#[derive(Debug, Clone, Copy)]
pub struct TickFrames<'a> {
    /// Frames the patterns were evaluated against, oldest first; the last is this tick's
    pub frames: &'a [&'a FrameSnapshot],
    pub history: &'a FrameHistory,
}

impl<'a> TickFrames<'a> {
    fn newest(&self) -> Option<&'a FrameSnapshot> {
        self.frames.last().copied()
    }
}

/// Owns every live action, keyed so that one action exists per (intent, hand, hand index)
#[derive(Debug, Clone)]
pub struct ActionTracker {
    actions: BTreeMap<ActionKey, ActiveAction>,
    grid: GridConfig,
    velocity_window_ms: f64,
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::new(GridConfig::default(), DEFAULT_VELOCITY_WINDOW_MS)
    }
}

impl ActionTracker {
    pub fn new(grid: GridConfig, velocity_window_ms: f64) -> Self {
        Self {
            actions: BTreeMap::new(),
            grid,
            velocity_window_ms,
        }
    }

    pub fn set_grid(&mut self, grid: GridConfig) {
        self.grid = grid;
    }

    pub fn set_velocity_window(&mut self, ms: f64) {
        self.velocity_window_ms = ms;
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Snapshot of live actions in key order
    pub fn actions(&self) -> Vec<ActiveAction> {
        self.actions.values().cloned().collect()
    }

    pub fn get(&self, key: &ActionKey) -> Option<&ActiveAction> {
        self.actions.get(key)
    }

    /// True if any of `hands` has no live action for `intent` yet
    pub fn opens_action(&self, intent: &Intent, hands: &[HandMatch]) -> bool {
        hands.iter().any(|hand| !self.actions.contains_key(&action_key(intent, hand)))
    }

    /// Advance every intent by one tick.
    ///
    /// `candidates[i]` lists the hands intent `i` matched on this tick (empty when it did not
    /// match). Intents whose index is in `suppressed` lost a conflict: they open no new action
    /// this tick, while their live actions carry on. Returns events in intent order.
    pub fn update(
        &mut self,
        intents: &[Intent],
        candidates: &[Vec<HandMatch>],
        suppressed: &[usize],
        tick: TickFrames<'_>,
    ) -> Vec<IntentEvent> {
        let mut events = Vec::new();
        let Some(newest) = tick.newest() else {
            return events;
        };
        let now = newest.timestamp;

        for (index, intent) in intents.iter().enumerate() {
            let may_open = !suppressed.contains(&index);
            let hands = candidates.get(index).map_or(&[][..], Vec::as_slice);
            let mut seen = HashSet::with_capacity(hands.len());

            for hand in hands {
                let key = action_key(intent, hand);
                if !may_open && !self.actions.contains_key(&key) {
                    continue;
                }
                let context = self.context_for(intent, hand, &tick, now);
                seen.insert(key.clone());
                self.on_match(intent, key, context, now, &mut events);
            }

            let unmatched: Vec<ActionKey> = self
                .actions
                .keys()
                .filter(|k| k.intent_id == intent.id() && !seen.contains(*k))
                .cloned()
                .collect();
            for key in unmatched {
                self.on_miss(intent, &key, &tick, now, &mut events);
            }
        }

        trace!("tick t={} -> {} events, {} live actions", now, events.len(), self.actions.len());
        events
    }

    fn on_match(
        &mut self,
        intent: &Intent,
        key: ActionKey,
        mut context: ActionContext,
        now: f64,
        events: &mut Vec<IntentEvent>,
    ) {
        let min_duration = intent.temporal().min_duration_ms;

        if let Some(action) = self.actions.get_mut(&key) {
            context.action_id = action.id.clone();
            context.duration = now - action.start_time;
            action.context = context;
            action.last_update_time = now;
            match action.state {
                ActionState::Pending => {
                    if now - action.start_time >= min_duration {
                        action.state = ActionState::Active;
                        debug!("action {} started", action.id);
                        events.push(IntentEvent::start(&action.context));
                    }
                }
                ActionState::Active => events.push(IntentEvent::update(&action.context)),
                ActionState::Ending => {
                    action.state = ActionState::Active;
                    events.push(IntentEvent::update(&action.context));
                }
            }
            return;
        }

        let id = action_id(intent.id(), key.hand, key.hand_index, now);
        context.action_id = id.clone();
        context.duration = 0.0;
        let mut action = ActiveAction {
            id,
            intent_id: intent.id().to_string(),
            state: ActionState::Pending,
            start_time: now,
            last_update_time: now,
            context,
        };
        if min_duration <= 0.0 {
            action.state = ActionState::Active;
            debug!("action {} started", action.id);
            events.push(IntentEvent::start(&action.context));
        }
        self.actions.insert(key, action);
    }

    fn on_miss(
        &mut self,
        intent: &Intent,
        key: &ActionKey,
        tick: &TickFrames<'_>,
        now: f64,
        events: &mut Vec<IntentEvent>,
    ) {
        let Some(action) = self.actions.get_mut(key) else {
            return;
        };
        match action.state {
            ActionState::Pending => {
                trace!("pending action {} lapsed", action.id);
                self.actions.remove(key);
                return;
            }
            ActionState::Active => action.state = ActionState::Ending,
            ActionState::Ending => {}
        }

        if now - action.last_update_time > intent.temporal().max_gap_ms {
            let reason = end_reason(intent, action, tick);
            action.context.timestamp = now;
            action.context.duration = now - action.start_time;
            debug!("action {} ended ({})", action.id, reason);
            events.push(IntentEvent::end(&action.context, reason));
            self.actions.remove(key);
        }
    }

    fn context_for(&self, intent: &Intent, hand: &HandMatch, tick: &TickFrames<'_>, now: f64) -> ActionContext {
        let selector = HandSelector::new(hand.handedness, hand.hand_index);
        let head_index = tick.newest().and_then(|f| f.nearest_face(hand.position));
        ActionContext {
            action_id: String::new(),
            intent_id: intent.id().to_string(),
            hand: hand.handedness,
            hand_index: hand.hand_index,
            position: hand.position,
            cell: self.grid.cell_for(hand.position),
            velocity: tick
                .history
                .average_velocity(selector, landmarks::WRIST, self.velocity_window_ms),
            head_index,
            timestamp: now,
            duration: 0.0,
        }
    }

    /// End every confirmed action with `reason` at `now`; pending actions vanish silently
    pub fn end_all(&mut self, reason: EndReason, now: f64) -> Vec<IntentEvent> {
        let mut events = Vec::new();
        for (_, mut action) in std::mem::take(&mut self.actions) {
            if !action.is_confirmed() {
                continue;
            }
            action.context.timestamp = now;
            action.context.duration = now - action.start_time;
            debug!("action {} ended ({})", action.id, reason);
            events.push(IntentEvent::end(&action.context, reason));
        }
        events
    }

    /// Forget every action without emitting anything
    pub fn discard_all(&mut self) {
        if !self.actions.is_empty() {
            debug!("discarding {} live actions", self.actions.len());
        }
        self.actions.clear();
    }

    /// Forget actions of intents no longer registered, without emitting anything
    pub fn retain_intents(&mut self, intents: &[Intent]) {
        let ids: HashSet<&str> = intents.iter().map(Intent::id).collect();
        self.actions.retain(|key, _| ids.contains(key.intent_id.as_str()));
    }
}

fn action_key(intent: &Intent, hand: &HandMatch) -> ActionKey {
    ActionKey {
        intent_id: intent.id().to_string(),
        hand: hand.handedness,
        hand_index: hand.hand_index,
    }
}

/// Why an unmatched action is ending on this tick
fn end_reason(intent: &Intent, action: &ActiveAction, tick: &TickFrames<'_>) -> EndReason {
    let Some(newest) = tick.newest() else {
        return EndReason::Timeout;
    };
    let selector = HandSelector::new(action.context.hand, action.context.hand_index);
    let hand = match selector.find(newest) {
        Some(hand) if hand.has_full_skeleton() => hand,
        _ => return EndReason::Timeout,
    };
    let action_held = intent
        .pattern()
        .action_components()
        .into_iter()
        .any(|part| action_part_holds(part, hand, tick.frames));
    if action_held {
        EndReason::Cancelled
    } else {
        EndReason::Completed
    }
}

/// Leaves are checked on the action's own hand; composites on the whole frame
fn action_part_holds(part: &PatternDef, hand: &RawHandDetection, frames: &[&FrameSnapshot]) -> bool {
    match part {
        PatternDef::Gesture(g) => gesture_holds(hand, g),
        PatternDef::Pinch(p) => pinch_holds(hand, p),
        PatternDef::AnyOf(_) | PatternDef::AllOf(_) | PatternDef::Sequence(_) => {
            matches_in_history(frames, part)
        }
    }
}
