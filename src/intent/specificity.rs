//! Static specificity score of a pattern tree

use crate::pattern::{PatternDef, SequenceMode};

/// Score of a single gesture or pinch leaf
pub const LEAF_SCORE: u32 = 10;
/// Added when a leaf requires a particular hand
pub const HAND_BONUS: u32 = 5;
/// Base score of `allOf` / `sequence`
pub const COMPOSITE_BASE: u32 = 20;
/// Added per child of `allOf` / `sequence`
pub const PER_CHILD: u32 = 5;
/// Added when a sequence also constrains order
pub const SEQUENTIAL_BONUS: u32 = 10;

/// Compute the specificity of a pattern.
///
/// Conjunctions score their base, a per-child amount and the sum of their children, so any
/// conjunction outranks each of its parts. `anyOf` is only as specific as its loosest branch.
pub fn specificity(pattern: &PatternDef) -> u32 {
    match pattern {
        PatternDef::Gesture(g) => leaf(g.hand.is_specific()),
        PatternDef::Pinch(p) => leaf(p.hand.is_specific()),
        PatternDef::AnyOf(c) => c.patterns.iter().map(specificity).min().unwrap_or(0),
        PatternDef::AllOf(c) => conjunction(&c.patterns),
        PatternDef::Sequence(s) => {
            let ordered = match s.mode {
                SequenceMode::Concurrent => 0,
                SequenceMode::Sequential => SEQUENTIAL_BONUS,
            };
            conjunction(&s.patterns) + ordered
        }
    }
}

fn leaf(hand_specific: bool) -> u32 {
    if hand_specific {
        LEAF_SCORE + HAND_BONUS
    } else {
        LEAF_SCORE
    }
}

fn conjunction(children: &[PatternDef]) -> u32 {
    COMPOSITE_BASE
        + PER_CHILD * children.len() as u32
        + children.iter().map(specificity).sum::<u32>()
}
