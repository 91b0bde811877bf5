//! Declarative gesture patterns
//!
//! - [`def`]: the closed `PatternDef` tree (serde-loadable)
//! - [`builder`]: immutable construction helpers (`gesture`, `pinch`, `all_of`, ...)
//! - [`matcher`]: pure evaluation against one frame or a run of frames
//! - [`extract`]: primary hand and position of a match

pub mod builder;
pub mod def;
pub mod extract;
pub mod matcher;

pub use builder::{all_of, any_of, bidirectional, gesture, pinch, sequence, Pattern};
pub use def::{
    CompositePattern, GesturePattern, HandConstraint, PatternDef, PinchPattern, SequenceMode,
    SequencePattern, DEFAULT_CONFIDENCE, DEFAULT_PINCH_THRESHOLD,
};
pub use extract::{
    candidate_hands, gesture_anchor, hand_position, resolve_primary_hand, Anchor, HandMatch,
    GESTURE_ANCHORS,
};
pub use matcher::{matches, matches_in_history, matching_hands};
