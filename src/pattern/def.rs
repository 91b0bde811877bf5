//! Pattern expression tree

use serde::{Deserialize, Serialize};

use crate::{
    error::{HandwaveError, Result},
    frame::{Finger, Gesture, Handedness},
};

/// Default minimum gesture score
pub const DEFAULT_CONFIDENCE: f32 = 0.7;
/// Default maximum thumb-to-finger distance for a pinch (normalised units)
pub const DEFAULT_PINCH_THRESHOLD: f32 = 0.06;

/// Which hand a leaf accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandConstraint {
    Left,
    Right,
    #[default]
    Any,
}

impl HandConstraint {
    pub fn accepts(self, handedness: Handedness) -> bool {
        match self {
            Self::Any => true,
            Self::Left => handedness == Handedness::Left,
            Self::Right => handedness == Handedness::Right,
        }
    }

    /// Whether a particular hand is required
    pub fn is_specific(self) -> bool {
        self != Self::Any
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Any => "any",
        }
    }
}

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

fn default_threshold() -> f32 {
    DEFAULT_PINCH_THRESHOLD
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A detector-classified gesture on one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GesturePattern {
    pub gesture: Gesture,
    #[serde(default)]
    pub hand: HandConstraint,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
}

/// Thumb tip touching a finger tip on one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinchPattern {
    pub finger: Finger,
    #[serde(default)]
    pub hand: HandConstraint,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
}

/// Children of `anyOf` / `allOf`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositePattern {
    pub patterns: Vec<PatternDef>,
    /// Child whose hand reports the position when no descendant is marked primary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_index: Option<usize>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
}

/// How a sequence relates its children in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceMode {
    /// All children on the same frame
    #[default]
    Concurrent,
    /// Children in order on strictly later frames
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePattern {
    pub patterns: Vec<PatternDef>,
    #[serde(default)]
    pub mode: SequenceMode,
    /// Window, in milliseconds ending at the newest frame, that sequential children must fit in.
    /// Unbounded (whole history) when absent.
    #[serde(default, rename = "within", skip_serializing_if = "Option::is_none")]
    pub within_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_index: Option<usize>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
}

/// Closed set of pattern nodes. Finite and acyclic by construction (children are owned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatternDef {
    Gesture(GesturePattern),
    Pinch(PinchPattern),
    AnyOf(CompositePattern),
    AllOf(CompositePattern),
    Sequence(SequencePattern),
}

impl PatternDef {
    /// Child nodes (empty for leaves)
    pub fn children(&self) -> &[PatternDef] {
        match self {
            Self::Gesture(_) | Self::Pinch(_) => &[],
            Self::AnyOf(c) | Self::AllOf(c) => &c.patterns,
            Self::Sequence(s) => &s.patterns,
        }
    }

    pub fn is_leaf(&self) -> bool {
        match self {
            Self::Gesture(_) | Self::Pinch(_) => true,
            Self::AnyOf(_) | Self::AllOf(_) | Self::Sequence(_) => false,
        }
    }

    /// Explicit `.primary()` marker
    pub fn is_primary(&self) -> bool {
        match self {
            Self::Gesture(g) => g.primary,
            Self::Pinch(p) => p.primary,
            Self::AnyOf(c) | Self::AllOf(c) => c.primary,
            Self::Sequence(s) => s.primary,
        }
    }

    /// Legacy by-index primary marker of a composite
    pub fn primary_index(&self) -> Option<usize> {
        match self {
            Self::Gesture(_) | Self::Pinch(_) => None,
            Self::AnyOf(c) | Self::AllOf(c) => c.primary_index,
            Self::Sequence(s) => s.primary_index,
        }
    }

    /// Hand constraint of a leaf
    pub fn hand(&self) -> Option<HandConstraint> {
        match self {
            Self::Gesture(g) => Some(g.hand),
            Self::Pinch(p) => Some(p.hand),
            Self::AnyOf(_) | Self::AllOf(_) | Self::Sequence(_) => None,
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(PatternDef::node_count).sum::<usize>()
    }

    /// How much history, in milliseconds, evaluating this tree may look at.
    ///
    /// Zero for trees without sequential nodes; infinite for an unbounded sequential node.
    pub fn history_window_ms(&self) -> f64 {
        let own = match self {
            Self::Sequence(s) if s.mode == SequenceMode::Sequential => {
                s.within_ms.unwrap_or(f64::INFINITY)
            }
            _ => 0.0,
        };
        self.children()
            .iter()
            .map(PatternDef::history_window_ms)
            .fold(own, f64::max)
    }

    /// The "action" parts of the tree: every node marked primary (without descending into
    /// one), else the composite's by-index child. Empty for a bare leaf, whose whole pattern
    /// is the action.
    pub fn action_components(&self) -> Vec<&PatternDef> {
        fn marked<'a>(node: &'a PatternDef, found: &mut Vec<&'a PatternDef>) {
            for child in node.children() {
                if child.is_primary() {
                    found.push(child);
                } else {
                    marked(child, found);
                }
            }
        }

        let mut found = Vec::new();
        marked(self, &mut found);
        if found.is_empty() {
            found.extend(
                self.primary_index()
                    .and_then(|index| self.children().get(index)),
            );
        }
        found
    }

    /// Structural validation of a tree loaded from configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Gesture(g) => {
                if !(0.0..=1.0).contains(&g.confidence) {
                    return Err(HandwaveError::invalid_parameter(
                        "confidence",
                        format!("{} is outside [0, 1]", g.confidence),
                    ));
                }
            }
            Self::Pinch(p) => {
                if !(p.threshold.is_finite() && p.threshold > 0.0) {
                    return Err(HandwaveError::invalid_parameter(
                        "threshold",
                        format!("{} must be a positive distance", p.threshold),
                    ));
                }
            }
            Self::AnyOf(c) | Self::AllOf(c) => {
                validate_children(&c.patterns, c.primary_index)?;
            }
            Self::Sequence(s) => {
                validate_children(&s.patterns, s.primary_index)?;
                if let Some(within) = s.within_ms {
                    if !(within.is_finite() && within > 0.0) {
                        return Err(HandwaveError::invalid_parameter(
                            "within",
                            format!("{} must be a positive duration", within),
                        ));
                    }
                }
            }
        }
        self.children().iter().try_for_each(PatternDef::validate)
    }
}

fn validate_children(children: &[PatternDef], primary_index: Option<usize>) -> Result<()> {
    if children.is_empty() {
        return Err(HandwaveError::invalid_parameter(
            "patterns",
            "Composite patterns need at least one child",
        ));
    }
    if let Some(index) = primary_index {
        if index >= children.len() {
            return Err(HandwaveError::invalid_parameter(
                "primaryIndex",
                format!("{} out of range for {} children", index, children.len()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fist() -> PatternDef {
        PatternDef::Gesture(GesturePattern {
            gesture: Gesture::ClosedFist,
            hand: HandConstraint::Left,
            confidence: DEFAULT_CONFIDENCE,
            primary: false,
        })
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"type":"allOf","patterns":[
            {"type":"pinch","finger":"index","hand":"left"},
            {"type":"gesture","gesture":"Pointing_Up","hand":"right","primary":true}
        ]}"#;
        let def: PatternDef = serde_json::from_str(json).unwrap();
        let PatternDef::AllOf(all) = &def else {
            panic!("expected allOf, got {:?}", def);
        };
        assert_eq!(all.patterns.len(), 2);
        match &all.patterns[0] {
            PatternDef::Pinch(p) => assert_eq!(p.threshold, DEFAULT_PINCH_THRESHOLD),
            other => panic!("expected pinch, got {:?}", other),
        }
        assert!(def.action_components()[0].is_primary());
        def.validate().unwrap();
    }

    #[test]
    fn test_sequence_window() {
        let seq = PatternDef::Sequence(SequencePattern {
            patterns: vec![fist(), fist()],
            mode: SequenceMode::Sequential,
            within_ms: Some(500.0),
            primary_index: None,
            primary: false,
        });
        assert_eq!(seq.history_window_ms(), 500.0);
        assert_eq!(fist().history_window_ms(), 0.0);

        let json = serde_json::to_string(&seq).unwrap();
        assert!(json.contains("\"within\":500"));
        assert!(json.contains("\"mode\":\"sequential\""));
    }

    #[test]
    fn test_validation() {
        let empty = PatternDef::AnyOf(CompositePattern {
            patterns: vec![],
            primary_index: None,
            primary: false,
        });
        assert!(empty.validate().is_err());

        let bad_index = PatternDef::AllOf(CompositePattern {
            patterns: vec![fist()],
            primary_index: Some(3),
            primary: false,
        });
        assert!(bad_index.validate().is_err());

        let mut loud = fist();
        if let PatternDef::Gesture(g) = &mut loud {
            g.confidence = 1.5;
        }
        assert!(loud.validate().is_err());
    }

    #[test]
    fn test_hand_constraint() {
        assert!(HandConstraint::Any.accepts(Handedness::Unknown));
        assert!(HandConstraint::Left.accepts(Handedness::Left));
        assert!(!HandConstraint::Left.accepts(Handedness::Right));
        assert!(!HandConstraint::Any.is_specific());
    }
}
