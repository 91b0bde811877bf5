//! Intents and the lifecycle of their live actions
//!
//! An [`Intent`] wraps a pattern with timing and conflict policy. Each tick the engine asks
//! the [`ConflictResolver`] which matching intents may proceed, then lets the
//! [`ActionTracker`] turn matches into `start`/`update`/`end` events.

pub mod action;
pub mod conflict;
pub mod def;
pub mod grid;
pub mod specificity;
pub mod tracker;

pub use action::{action_id, ActionContext, ActionKey, ActionState, ActiveAction, EndReason};
pub use conflict::{
    default_rank, ConflictCandidate, ConflictComparator, ConflictResolver, Resolution,
    ResolutionStrategy,
};
pub use def::{Intent, IntentSet, ResolutionConfig, TemporalConfig, DEFAULT_MAX_GAP_MS};
pub use grid::{Cell, GridConfig};
pub use specificity::specificity;
pub use tracker::{ActionTracker, TickFrames, DEFAULT_VELOCITY_WINDOW_MS};
