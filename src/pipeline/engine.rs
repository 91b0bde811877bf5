//! Consumer-side intent engine
//!
//! One tick: append the frame to history, evaluate every intent, resolve conflicts per
//! group, advance the action lifecycle, publish the resulting events. A tick does no I/O
//! and never blocks.

use std::sync::Arc;

use log::{debug, info, trace};
use serde::Serialize;

use crate::{
    channel::FrameReader,
    error::{HandwaveError, Result},
    events::{EventBus, IntentEvent},
    frame::FrameSnapshot,
    history::FrameHistory,
    intent::{
        ActionTracker, ActiveAction, ConflictResolver, EndReason, Intent, IntentSet,
        ResolutionStrategy, TickFrames,
    },
    pattern::{candidate_hands, HandMatch},
};

use super::{clock::MonotonicClock, config::EngineConfig};

/// Control state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    Running,
    Paused,
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub frames_processed: u64,
    pub events_emitted: u64,
    /// New actions held back by conflict resolution
    pub suppressed_matches: u64,
    /// Times the frame stream went silent and actions were timed out
    pub tracking_timeouts: u64,
}

/// Matches intents against incoming frames and emits lifecycle events
#[derive(Debug)]
pub struct IntentEngine {
    config: EngineConfig,
    intents: Vec<Intent>,
    staged: Option<Vec<Intent>>,
    history: FrameHistory,
    tracker: ActionTracker,
    resolver: ConflictResolver,
    bus: Arc<EventBus>,
    clock: MonotonicClock,
    state: EngineState,
    last_frame_at: Option<f64>,
    stats: EngineStats,
}

impl IntentEngine {
    /// Create a stopped engine with its own event bus
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_bus(config, Arc::new(EventBus::new()))
    }

    /// Create a stopped engine publishing to an existing bus
    pub fn with_bus(config: EngineConfig, bus: Arc<EventBus>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: FrameHistory::new(config.history_capacity)?,
            tracker: ActionTracker::new(config.grid.clone(), config.velocity_window_ms),
            resolver: ConflictResolver::new(config.groups.clone()),
            config,
            intents: Vec::new(),
            staged: None,
            bus,
            clock: MonotonicClock::new(),
            state: EngineState::Stopped,
            last_frame_at: None,
            stats: EngineStats::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Replace the registered intents. Validated now, applied on the next tick.
    pub fn configure(&mut self, intents: Vec<Intent>) -> Result<()> {
        let set = IntentSet::new(intents)?;
        debug!("staged {} intents for the next tick", set.len());
        self.staged = Some(set.into_intents());
        Ok(())
    }

    pub fn configure_set(&mut self, set: IntentSet) -> Result<()> {
        self.configure(set.into_intents())
    }

    /// Set the conflict strategy of one group (including custom comparators)
    pub fn set_group_strategy(&mut self, group: impl Into<String>, strategy: ResolutionStrategy) -> Result<()> {
        strategy.validate()?;
        self.resolver.set_strategy(group, strategy);
        Ok(())
    }

    /// Intents in effect for the current tick
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn start(&mut self) {
        if self.state == EngineState::Stopped {
            info!("engine started with {} intents", self.staged.as_ref().unwrap_or(&self.intents).len());
        }
        self.state = EngineState::Running;
    }

    /// Stop processing. Live actions are discarded without `end` events and history is
    /// cleared; there is no guarantee anyone is still listening.
    pub fn stop(&mut self) {
        self.state = EngineState::Stopped;
        self.tracker.discard_all();
        self.history.clear();
        self.clock.reset();
        self.last_frame_at = None;
        info!("engine stopped");
    }

    /// Ignore frames until resumed; actions and history are kept
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            EngineState::Running => {
                self.state = EngineState::Paused;
                Ok(())
            }
            EngineState::Paused => Ok(()),
            EngineState::Stopped => Err(HandwaveError::pipeline("Cannot pause a stopped engine")),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            EngineState::Paused | EngineState::Running => {
                self.state = EngineState::Running;
                Ok(())
            }
            EngineState::Stopped => Err(HandwaveError::pipeline(
                "Cannot resume a stopped engine; call start()",
            )),
        }
    }

    /// Poll the channel once. With no new frame, checks the tracking timeout instead.
    pub fn poll(&mut self, reader: &mut FrameReader, now_ms: f64) -> Vec<IntentEvent> {
        if self.state != EngineState::Running {
            return Vec::new();
        }
        match reader.poll() {
            Some(frame) => self.process_frame(frame),
            None => self.check_timeout(now_ms),
        }
    }

    /// Run one tick on `frame`. Frames are ignored unless the engine is running.
    pub fn process_frame(&mut self, mut frame: FrameSnapshot) -> Vec<IntentEvent> {
        if self.state != EngineState::Running {
            trace!("engine {:?}, ignoring frame t={}", self.state, frame.timestamp);
            return Vec::new();
        }
        self.apply_staged();

        frame.timestamp = self.clock.next(frame.timestamp);
        let frame = Arc::new(frame);
        self.history.push(Arc::clone(&frame));
        self.last_frame_at = Some(frame.timestamp);
        self.stats.frames_processed += 1;

        let window_ms = self
            .intents
            .iter()
            .map(|i| i.pattern().history_window_ms())
            .fold(0.0, f64::max);
        let window = self.history.frames_in_window(window_ms);
        let frames: Vec<&FrameSnapshot> = window.iter().map(Arc::as_ref).collect();

        let candidates: Vec<Vec<HandMatch>> = self
            .intents
            .iter()
            .map(|intent| candidate_hands(&frames, intent.pattern()))
            .collect();
        let matched: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, hands)| !hands.is_empty())
            .map(|(i, _)| i)
            .collect();

        let continuing: Vec<usize> = matched
            .iter()
            .copied()
            .filter(|&i| !self.tracker.opens_action(&self.intents[i], &candidates[i]))
            .collect();
        let resolution = self.resolver.resolve(&self.intents, &matched, &continuing);
        self.stats.suppressed_matches += resolution.suppressed.len() as u64;

        let events = self.tracker.update(
            &self.intents,
            &candidates,
            &resolution.suppressed,
            TickFrames {
                frames: &frames,
                history: &self.history,
            },
        );
        self.emit(&events);
        events
    }

    /// End every live action with `timeout` if no frame arrived for the tracking timeout
    pub fn check_timeout(&mut self, now_ms: f64) -> Vec<IntentEvent> {
        let Some(last) = self.last_frame_at else {
            return Vec::new();
        };
        if self.tracker.is_empty() || now_ms - last < self.config.tracking_timeout_ms {
            return Vec::new();
        }
        debug!("no frame for {}ms, timing out {} actions", now_ms - last, self.tracker.len());
        self.stats.tracking_timeouts += 1;
        let events = self.tracker.end_all(EndReason::Timeout, now_ms);
        self.emit(&events);
        events
    }

    fn apply_staged(&mut self) {
        if let Some(intents) = self.staged.take() {
            self.tracker.retain_intents(&intents);
            info!("applied {} intents", intents.len());
            self.intents = intents;
        }
    }

    fn emit(&mut self, events: &[IntentEvent]) {
        self.stats.events_emitted += events.len() as u64;
        self.bus.publish_all(events);
    }

    /// Read-only copy of the frame history, oldest first
    pub fn frame_history(&self) -> Vec<Arc<FrameSnapshot>> {
        self.history.to_vec()
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    /// Read-only snapshot of live actions
    pub fn active_actions(&self) -> Vec<ActiveAction> {
        self.tracker.actions()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}
