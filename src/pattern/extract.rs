//! Which hand "does" a match, and where
//!
//! Primary hand resolution, first hit wins:
//! 1. the first descendant marked `.primary()` inside a branch that matched,
//! 2. the composite's `primaryIndex` child,
//! 3. heuristics: a right hand if a matched branch explicitly required right, else a left
//!    hand if one required left, else the first hand that satisfied any matched leaf.

use crate::frame::{landmarks, FrameSnapshot, Gesture, Handedness, RawHandDetection, Vec3};

use super::{
    def::{HandConstraint, PatternDef, SequenceMode},
    matcher::{leaf_holds_for_hand, matches_in_history, sequential_match_frames},
};

/// Reference point on a hand used as the event position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Mean of wrist and the four finger MCP joints
    PalmCentroid,
    Landmark(usize),
    Midpoint(usize, usize),
}

impl Anchor {
    pub fn resolve(self, hand: &RawHandDetection) -> Option<Vec3> {
        match self {
            Anchor::PalmCentroid => hand.palm_center(),
            Anchor::Landmark(i) => hand.landmark(i),
            Anchor::Midpoint(a, b) => Some(hand.landmark(a)?.midpoint(hand.landmark(b)?)),
        }
    }
}

/// Per-gesture anchor table
pub const GESTURE_ANCHORS: [(Gesture, Anchor); 8] = [
    (Gesture::None, Anchor::PalmCentroid),
    (Gesture::ClosedFist, Anchor::PalmCentroid),
    (Gesture::OpenPalm, Anchor::PalmCentroid),
    (Gesture::PointingUp, Anchor::Landmark(landmarks::INDEX_FINGER_TIP)),
    (Gesture::ThumbDown, Anchor::Landmark(landmarks::THUMB_TIP)),
    (Gesture::ThumbUp, Anchor::Landmark(landmarks::THUMB_TIP)),
    (
        Gesture::Victory,
        Anchor::Midpoint(landmarks::INDEX_FINGER_TIP, landmarks::MIDDLE_FINGER_TIP),
    ),
    (Gesture::ILoveYou, Anchor::PalmCentroid),
];

pub fn gesture_anchor(gesture: Gesture) -> Anchor {
    GESTURE_ANCHORS
        .iter()
        .find(|(g, _)| *g == gesture)
        .map_or(Anchor::PalmCentroid, |(_, anchor)| *anchor)
}

/// Anchor for the leaf a hand satisfied
pub fn leaf_anchor(leaf: &PatternDef) -> Anchor {
    match leaf {
        PatternDef::Gesture(g) => gesture_anchor(g.gesture),
        PatternDef::Pinch(p) => Anchor::Midpoint(landmarks::THUMB_TIP, p.finger.tip()),
        PatternDef::AnyOf(_) | PatternDef::AllOf(_) | PatternDef::Sequence(_) => {
            Anchor::PalmCentroid
        }
    }
}

/// A hand credited with a match, with its reported position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandMatch {
    pub hand_index: usize,
    pub handedness: Handedness,
    pub position: Vec3,
}

/// Hands an intent's match is attributed to on the newest frame.
///
/// A bare leaf yields every hand that satisfies it; any composite yields its single
/// primary hand. Empty when the pattern does not match.
pub fn candidate_hands(frames: &[&FrameSnapshot], pattern: &PatternDef) -> Vec<HandMatch> {
    let Some(newest) = frames.last() else {
        return Vec::new();
    };
    if pattern.is_leaf() {
        return (0..newest.hands.len())
            .filter(|&i| leaf_holds_for_hand(newest, i, pattern))
            .filter_map(|i| hand_match(newest, i, leaf_anchor(pattern)))
            .collect();
    }
    if !matches_in_history(frames, pattern) {
        return Vec::new();
    }
    resolve_primary_hand(frames, pattern)
        .and_then(|index| hand_match(newest, index, anchor_for_hand(frames, pattern, index)))
        .into_iter()
        .collect()
}

/// Index, in the newest frame, of the hand that represents a matched pattern
pub fn resolve_primary_hand(frames: &[&FrameSnapshot], pattern: &PatternDef) -> Option<usize> {
    let newest = frames.last()?;
    if pattern.is_leaf() {
        return (0..newest.hands.len()).find(|&i| leaf_holds_for_hand(newest, i, pattern));
    }
    if let Some(hand) = marked_primary_hand(frames, pattern) {
        return Some(hand);
    }
    if let Some(child) = pattern
        .primary_index()
        .and_then(|index| pattern.children().get(index))
    {
        if let Some(hand) = resolve_primary_hand(frames, child) {
            return Some(hand);
        }
    }
    heuristic_hand(frames, pattern)
}

/// Position of a hand using the anchor of the first matched leaf it satisfies
pub fn hand_position(frames: &[&FrameSnapshot], pattern: &PatternDef, index: usize) -> Option<Vec3> {
    let newest = frames.last()?;
    anchor_for_hand(frames, pattern, index).resolve(newest.hand(index)?)
}

fn hand_match(frame: &FrameSnapshot, index: usize, anchor: Anchor) -> Option<HandMatch> {
    let hand = frame.hand(index)?;
    let position = anchor
        .resolve(hand)
        .or_else(|| hand.wrist())
        .unwrap_or(Vec3::ZERO);
    Some(HandMatch {
        hand_index: index,
        handedness: hand.handedness,
        position,
    })
}

fn anchor_for_hand(frames: &[&FrameSnapshot], pattern: &PatternDef, index: usize) -> Anchor {
    let mut leaves = Vec::new();
    matched_leaves(frames, pattern, &mut leaves);
    let Some(newest) = frames.last() else {
        return Anchor::PalmCentroid;
    };
    // Marked leaves first so a two-role hand reports its action anchor
    leaves.sort_by_key(|leaf| !leaf.is_primary());
    leaves
        .into_iter()
        .find(|leaf| leaf_holds_for_hand(newest, index, leaf))
        .map_or(Anchor::PalmCentroid, leaf_anchor)
}

fn marked_primary_hand(frames: &[&FrameSnapshot], node: &PatternDef) -> Option<usize> {
    for child in active_children(frames, node) {
        if child.is_primary() {
            // An earlier step of a sequential node has no hand on the newest frame
            if let Some(hand) = resolve_primary_hand(frames, child) {
                return Some(hand);
            }
            continue;
        }
        if let Some(hand) = marked_primary_hand(frames, child) {
            return Some(hand);
        }
    }
    None
}

fn heuristic_hand(frames: &[&FrameSnapshot], pattern: &PatternDef) -> Option<usize> {
    let newest = frames.last()?;
    let mut leaves = Vec::new();
    matched_leaves(frames, pattern, &mut leaves);

    let required = |constraint: HandConstraint| leaves.iter().any(|l| l.hand() == Some(constraint));
    let first_with = |handedness: Handedness| {
        newest
            .hands
            .iter()
            .position(|hand| hand.handedness == handedness)
    };

    if required(HandConstraint::Right) {
        if let Some(index) = first_with(Handedness::Right) {
            return Some(index);
        }
    }
    if required(HandConstraint::Left) {
        if let Some(index) = first_with(Handedness::Left) {
            return Some(index);
        }
    }
    (0..newest.hands.len())
        .find(|&i| leaves.iter().any(|leaf| leaf_holds_for_hand(newest, i, leaf)))
        .or_else(|| (!newest.hands.is_empty()).then_some(0))
}

/// Children of a matched node that took part in the match on the newest frame
fn active_children<'p>(frames: &[&FrameSnapshot], node: &'p PatternDef) -> Vec<&'p PatternDef> {
    match node {
        PatternDef::Gesture(_) | PatternDef::Pinch(_) => Vec::new(),
        PatternDef::AnyOf(c) => c
            .patterns
            .iter()
            .filter(|child| matches_in_history(frames, child))
            .collect(),
        PatternDef::AllOf(c) => c.patterns.iter().collect(),
        PatternDef::Sequence(s) => s.patterns.iter().collect(),
    }
}

/// Leaves of matched branches that hold on the newest frame.
///
/// Earlier steps of a sequential node matched on older frames, so only its last child
/// contributes hands here.
fn matched_leaves<'p>(frames: &[&FrameSnapshot], node: &'p PatternDef, out: &mut Vec<&'p PatternDef>) {
    match node {
        PatternDef::Gesture(_) | PatternDef::Pinch(_) => {
            if matches_in_history(frames, node) {
                out.push(node);
            }
        }
        PatternDef::Sequence(s)
            if s.mode == SequenceMode::Sequential
                && sequential_match_frames(frames, s).is_some() =>
        {
            if let Some(last) = s.patterns.last() {
                matched_leaves(frames, last, out);
            }
        }
        _ => {
            for child in active_children(frames, node) {
                matched_leaves(frames, child, out);
            }
        }
    }
}
