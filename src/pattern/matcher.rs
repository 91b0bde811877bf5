//! Pure evaluation of pattern trees against frames
//!
//! Nothing here allocates on the hot path except the sequential search, and nothing ever
//! fails: malformed input (short skeletons, empty hand lists) simply does not match.

use crate::frame::{landmarks, FrameSnapshot, Gesture, RawHandDetection};

use super::def::{GesturePattern, PatternDef, PinchPattern, SequenceMode, SequencePattern};

/// Whether `pattern` holds on a single frame.
///
/// Sequential nodes see only this frame, so they match only when they have one child.
pub fn matches(frame: &FrameSnapshot, pattern: &PatternDef) -> bool {
    matches_in_history(&[frame], pattern)
}

/// Whether `pattern` holds on the newest of `frames` (oldest first).
///
/// Earlier frames are consulted only by sequential nodes.
pub fn matches_in_history(frames: &[&FrameSnapshot], pattern: &PatternDef) -> bool {
    let Some(newest) = frames.last() else {
        return false;
    };
    match pattern {
        PatternDef::Gesture(g) => newest.hands.iter().any(|hand| gesture_holds(hand, g)),
        PatternDef::Pinch(p) => newest.hands.iter().any(|hand| pinch_holds(hand, p)),
        PatternDef::AnyOf(c) => c.patterns.iter().any(|child| matches_in_history(frames, child)),
        PatternDef::AllOf(c) => {
            !c.patterns.is_empty() && c.patterns.iter().all(|child| matches_in_history(frames, child))
        }
        PatternDef::Sequence(s) => match s.mode {
            SequenceMode::Concurrent => {
                !s.patterns.is_empty()
                    && s.patterns.iter().all(|child| matches_in_history(frames, child))
            }
            SequenceMode::Sequential => sequential_match_frames(frames, s).is_some(),
        },
    }
}

/// Frame indices (into `frames`) at which each child of a sequential node matched.
///
/// The last child must match the newest frame; each earlier child must match a strictly
/// earlier frame inside the window. The search takes the latest qualifying frame for every
/// child, walking backwards, which finds an ordering whenever one exists.
pub fn sequential_match_frames(
    frames: &[&FrameSnapshot],
    sequence: &SequencePattern,
) -> Option<Vec<usize>> {
    let newest = frames.len().checked_sub(1)?;
    let (last_child, earlier) = sequence.patterns.split_last()?;
    if !matches_in_history(frames, last_child) {
        return None;
    }

    let window_start = sequence
        .within_ms
        .map_or(f64::NEG_INFINITY, |within| frames[newest].timestamp - within);

    let mut positions = vec![newest];
    let mut cursor = newest;
    for child in earlier.iter().rev() {
        let later_ts = frames[cursor].timestamp;
        let found = (0..cursor).rev().find(|&i| {
            let ts = frames[i].timestamp;
            ts >= window_start && ts < later_ts && matches_in_history(&frames[..=i], child)
        })?;
        positions.push(found);
        cursor = found;
    }
    positions.reverse();
    Some(positions)
}

/// Gesture leaf test for one hand; equality with the confidence counts as a match
pub fn gesture_holds(hand: &RawHandDetection, pattern: &GesturePattern) -> bool {
    pattern.hand.accepts(hand.handedness)
        && hand.gesture == pattern.gesture
        && hand.gesture_score >= pattern.confidence
}

/// Pinch leaf test for one hand.
///
/// A classified gesture and a pinch are mutually exclusive on the same hand in the same frame.
pub fn pinch_holds(hand: &RawHandDetection, pattern: &PinchPattern) -> bool {
    if !pattern.hand.accepts(hand.handedness)
        || !hand.has_full_skeleton()
        || hand.gesture != Gesture::None
    {
        return false;
    }
    pinch_distance(hand, pattern).map_or(false, |d| d <= pattern.threshold)
}

/// 3D distance between the thumb tip and the pinching finger tip
pub fn pinch_distance(hand: &RawHandDetection, pattern: &PinchPattern) -> Option<f32> {
    let thumb = hand.landmark(landmarks::THUMB_TIP)?;
    let finger = hand.landmark(pattern.finger.tip())?;
    Some(thumb.distance(finger))
}

/// Whether hand `index` of the newest frame satisfies a leaf. Composites answer `false`.
pub fn leaf_holds_for_hand(frame: &FrameSnapshot, index: usize, leaf: &PatternDef) -> bool {
    let Some(hand) = frame.hand(index) else {
        return false;
    };
    match leaf {
        PatternDef::Gesture(g) => gesture_holds(hand, g),
        PatternDef::Pinch(p) => pinch_holds(hand, p),
        PatternDef::AnyOf(_) | PatternDef::AllOf(_) | PatternDef::Sequence(_) => false,
    }
}

/// Indices of hands in `frame` that satisfy a leaf
pub fn matching_hands(frame: &FrameSnapshot, leaf: &PatternDef) -> Vec<usize> {
    (0..frame.hands.len())
        .filter(|&i| leaf_holds_for_hand(frame, i, leaf))
        .collect()
}
