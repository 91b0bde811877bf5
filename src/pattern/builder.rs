//! Immutable pattern builder
//!
//! Every modifier takes `&self` and returns a new [`Pattern`]; the receiver is never
//! touched, so a base pattern can be shared by any number of intents.
//!
//! ```
//! use handwave::frame::{Finger, Gesture};
//! use handwave::pattern::{all_of, gesture, pinch};
//!
//! let point = gesture(Gesture::PointingUp).right();
//! let chord = all_of([pinch(Finger::Index).left(), point.primary()]);
//! assert!(!point.def().is_primary());
//! assert_eq!(chord.def().children().len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::frame::{Finger, Gesture};

use super::def::{
    CompositePattern, GesturePattern, HandConstraint, PatternDef, PinchPattern, SequenceMode,
    SequencePattern, DEFAULT_CONFIDENCE, DEFAULT_PINCH_THRESHOLD,
};

/// Value-type handle over a [`PatternDef`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(PatternDef);

impl Pattern {
    pub fn def(&self) -> &PatternDef {
        &self.0
    }

    pub fn into_def(self) -> PatternDef {
        self.0
    }

    fn map(&self, f: impl FnOnce(&mut PatternDef)) -> Pattern {
        let mut def = self.0.clone();
        f(&mut def);
        Pattern(def)
    }

    /// Constrain every leaf to `hand`
    pub fn with_hand(&self, hand: HandConstraint) -> Pattern {
        self.map(|def| set_hand(def, hand))
    }

    pub fn left(&self) -> Pattern {
        self.with_hand(HandConstraint::Left)
    }

    pub fn right(&self) -> Pattern {
        self.with_hand(HandConstraint::Right)
    }

    /// Minimum score for gesture leaves; pinch leaves are unaffected
    pub fn with_confidence(&self, confidence: f32) -> Pattern {
        self.map(|def| {
            visit_leaves(def, &mut |leaf| {
                if let PatternDef::Gesture(g) = leaf {
                    g.confidence = confidence;
                }
            })
        })
    }

    /// Maximum distance for pinch leaves; gesture leaves are unaffected
    pub fn with_threshold(&self, threshold: f32) -> Pattern {
        self.map(|def| {
            visit_leaves(def, &mut |leaf| {
                if let PatternDef::Pinch(p) = leaf {
                    p.threshold = threshold;
                }
            })
        })
    }

    /// Mark this node as the one whose hand reports the event position
    pub fn primary(&self) -> Pattern {
        self.map(|def| match def {
            PatternDef::Gesture(g) => g.primary = true,
            PatternDef::Pinch(p) => p.primary = true,
            PatternDef::AnyOf(c) | PatternDef::AllOf(c) => c.primary = true,
            PatternDef::Sequence(s) => s.primary = true,
        })
    }

    /// Legacy positional primary marker; ignored on leaves
    pub fn with_primary_index(&self, index: usize) -> Pattern {
        self.map(|def| match def {
            PatternDef::Gesture(_) | PatternDef::Pinch(_) => {}
            PatternDef::AnyOf(c) | PatternDef::AllOf(c) => c.primary_index = Some(index),
            PatternDef::Sequence(s) => s.primary_index = Some(index),
        })
    }

    /// Switch a sequence to ordered matching; ignored on other nodes
    pub fn sequential(&self) -> Pattern {
        self.map(|def| {
            if let PatternDef::Sequence(s) = def {
                s.mode = SequenceMode::Sequential;
            }
        })
    }

    /// Time window for a sequence; ignored on other nodes
    pub fn within(&self, ms: f64) -> Pattern {
        self.map(|def| {
            if let PatternDef::Sequence(s) = def {
                s.within_ms = Some(ms);
            }
        })
    }
}

impl From<Pattern> for PatternDef {
    fn from(pattern: Pattern) -> Self {
        pattern.0
    }
}

impl From<PatternDef> for Pattern {
    fn from(def: PatternDef) -> Self {
        Pattern(def)
    }
}

fn set_hand(def: &mut PatternDef, hand: HandConstraint) {
    visit_leaves(def, &mut |leaf| match leaf {
        PatternDef::Gesture(g) => g.hand = hand,
        PatternDef::Pinch(p) => p.hand = hand,
        PatternDef::AnyOf(_) | PatternDef::AllOf(_) | PatternDef::Sequence(_) => {}
    })
}

fn visit_leaves(def: &mut PatternDef, f: &mut dyn FnMut(&mut PatternDef)) {
    match def {
        PatternDef::Gesture(_) | PatternDef::Pinch(_) => f(def),
        PatternDef::AnyOf(c) | PatternDef::AllOf(c) => {
            c.patterns.iter_mut().for_each(|child| visit_leaves(child, f))
        }
        PatternDef::Sequence(s) => s.patterns.iter_mut().for_each(|child| visit_leaves(child, f)),
    }
}

fn composite<I: IntoIterator<Item = Pattern>>(patterns: I) -> CompositePattern {
    CompositePattern {
        patterns: patterns.into_iter().map(Pattern::into_def).collect(),
        primary_index: None,
        primary: false,
    }
}

/// Detector gesture on any hand at the default confidence
pub fn gesture(gesture: Gesture) -> Pattern {
    Pattern(PatternDef::Gesture(GesturePattern {
        gesture,
        hand: HandConstraint::Any,
        confidence: DEFAULT_CONFIDENCE,
        primary: false,
    }))
}

/// Thumb-to-finger pinch on any hand at the default threshold
pub fn pinch(finger: Finger) -> Pattern {
    Pattern(PatternDef::Pinch(PinchPattern {
        finger,
        hand: HandConstraint::Any,
        threshold: DEFAULT_PINCH_THRESHOLD,
        primary: false,
    }))
}

pub fn any_of<I: IntoIterator<Item = Pattern>>(patterns: I) -> Pattern {
    Pattern(PatternDef::AnyOf(composite(patterns)))
}

pub fn all_of<I: IntoIterator<Item = Pattern>>(patterns: I) -> Pattern {
    Pattern(PatternDef::AllOf(composite(patterns)))
}

/// Concurrent sequence; chain [`Pattern::sequential`] and [`Pattern::within`] for ordering
pub fn sequence<I: IntoIterator<Item = Pattern>>(patterns: I) -> Pattern {
    Pattern(PatternDef::Sequence(SequencePattern {
        patterns: patterns.into_iter().map(Pattern::into_def).collect(),
        mode: SequenceMode::Concurrent,
        within_ms: None,
        primary_index: None,
        primary: false,
    }))
}

/// Either hand may hold the modifier while the other performs the action.
///
/// `anyOf(allOf(modifier.left, action.primary.right), allOf(modifier.right, action.primary.left))`
pub fn bidirectional(modifier: &Pattern, action: &Pattern) -> Pattern {
    let action = action.primary();
    any_of([
        all_of([modifier.left(), action.right()]),
        all_of([modifier.right(), action.left()]),
    ])
}
