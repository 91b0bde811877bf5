//! Conflict resolution between intents matching in the same group

use std::{cmp::Ordering, collections::HashMap, fmt, sync::Arc};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{HandwaveError, Result};

use super::def::Intent;

/// What the resolver knows about a competing intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCandidate {
    pub intent_id: String,
    pub priority: i32,
    pub specificity: u32,
}

impl ConflictCandidate {
    fn from_intent(intent: &Intent) -> Self {
        Self {
            intent_id: intent.id().to_string(),
            priority: intent.priority(),
            specificity: intent.specificity(),
        }
    }
}

/// Caller-supplied ordering: `Less` ranks first
#[derive(Clone)]
pub struct ConflictComparator(Arc<dyn Fn(&ConflictCandidate, &ConflictCandidate) -> Ordering + Send + Sync>);

impl ConflictComparator {
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&ConflictCandidate, &ConflictCandidate) -> Ordering + Send + Sync + 'static,
    {
        Self(Arc::new(compare))
    }

    fn compare(&self, a: &ConflictCandidate, b: &ConflictCandidate) -> Ordering {
        (self.0)(a, b)
    }
}

impl fmt::Debug for ConflictComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConflictComparator(..)")
    }
}

/// Strategy applied to one group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Only the best candidate proceeds
    #[default]
    WinnerTakesAll,
    /// The `k` best candidates proceed
    TopK { k: usize },
    /// Best candidate under a caller ordering proceeds
    #[serde(skip)]
    Custom(ConflictComparator),
}

impl ResolutionStrategy {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::TopK { k: 0 } => Err(HandwaveError::invalid_parameter(
                "k",
                "Top-k resolution needs k > 0",
            )),
            Self::WinnerTakesAll | Self::TopK { .. } | Self::Custom(_) => Ok(()),
        }
    }

    fn keep(&self) -> usize {
        match self {
            Self::WinnerTakesAll | Self::Custom(_) => 1,
            Self::TopK { k } => *k,
        }
    }
}

/// Default ranking: priority desc, then specificity desc, then id asc for determinism
pub fn default_rank(a: &ConflictCandidate, b: &ConflictCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(b.specificity.cmp(&a.specificity))
        .then_with(|| a.intent_id.cmp(&b.intent_id))
}

/// Outcome of one resolution pass, as indices into the intent slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub winners: Vec<usize>,
    pub suppressed: Vec<usize>,
}

/// Applies per-group strategies to the intents that matched this tick
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    strategies: HashMap<String, ResolutionStrategy>,
    fallback: ResolutionStrategy,
}

impl ConflictResolver {
    pub fn new(strategies: HashMap<String, ResolutionStrategy>) -> Self {
        Self {
            strategies,
            fallback: ResolutionStrategy::WinnerTakesAll,
        }
    }

    pub fn set_strategy(&mut self, group: impl Into<String>, strategy: ResolutionStrategy) {
        self.strategies.insert(group.into(), strategy);
    }

    pub fn strategy(&self, group: &str) -> &ResolutionStrategy {
        self.strategies.get(group).unwrap_or(&self.fallback)
    }

    /// Split `matched` (indices into `intents`) into winners and suppressed.
    ///
    /// Intents in `continuing` only carry on actions that are already live. They hold their
    /// rank in the group but are never suppressed, so only intents opening a new action can
    /// lose. Ungrouped intents always win. Winners keep their input order.
    pub fn resolve(&self, intents: &[Intent], matched: &[usize], continuing: &[usize]) -> Resolution {
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut winners = Vec::with_capacity(matched.len());
        let mut suppressed = Vec::new();

        for &index in matched {
            match intents.get(index).and_then(Intent::group) {
                Some(group) => groups.entry(group).or_default().push(index),
                None => winners.push(index),
            }
        }

        for (group, mut members) in groups {
            if members.len() < 2 {
                winners.extend(members);
                continue;
            }
            let strategy = self.strategy(group);
            members.sort_by(|&a, &b| {
                let (a, b) = (
                    ConflictCandidate::from_intent(&intents[a]),
                    ConflictCandidate::from_intent(&intents[b]),
                );
                match strategy {
                    ResolutionStrategy::Custom(cmp) => {
                        cmp.compare(&a, &b).then_with(|| default_rank(&a, &b))
                    }
                    ResolutionStrategy::WinnerTakesAll | ResolutionStrategy::TopK { .. } => {
                        default_rank(&a, &b)
                    }
                }
            });
            let keep = strategy.keep().min(members.len());
            winners.extend_from_slice(&members[..keep]);
            for &ranked_out in &members[keep..] {
                if continuing.contains(&ranked_out) {
                    winners.push(ranked_out);
                    continue;
                }
                debug!(
                    "group '{}': suppressing '{}' this tick",
                    group,
                    intents[ranked_out].id()
                );
                suppressed.push(ranked_out);
            }
        }

        winners.sort_unstable();
        suppressed.sort_unstable();
        Resolution { winners, suppressed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Finger, Gesture};
    use crate::pattern::{all_of, gesture, pinch};

    fn intents() -> Vec<Intent> {
        vec![
            Intent::new("low", gesture(Gesture::OpenPalm)).in_group("tools", 5),
            Intent::new("high", gesture(Gesture::OpenPalm)).in_group("tools", 10),
            Intent::new("free", gesture(Gesture::OpenPalm)),
            Intent::new("specific", all_of([pinch(Finger::Index), gesture(Gesture::OpenPalm)]))
                .in_group("tools", 5),
        ]
    }

    #[test]
    fn test_winner_takes_all_by_priority() {
        let resolution = ConflictResolver::default().resolve(&intents(), &[0, 1, 2], &[]);
        assert_eq!(resolution.winners, vec![1, 2]);
        assert_eq!(resolution.suppressed, vec![0]);
    }

    #[test]
    fn test_specificity_breaks_priority_ties() {
        let resolution = ConflictResolver::default().resolve(&intents(), &[0, 3], &[]);
        assert_eq!(resolution.winners, vec![3]);
    }

    #[test]
    fn test_top_k() {
        let mut resolver = ConflictResolver::default();
        resolver.set_strategy("tools", ResolutionStrategy::TopK { k: 2 });
        let resolution = resolver.resolve(&intents(), &[0, 1, 3], &[]);
        assert_eq!(resolution.winners, vec![1, 3]);
        assert_eq!(resolution.suppressed, vec![0]);
    }

    #[test]
    fn test_custom_comparator() {
        let mut resolver = ConflictResolver::default();
        // Lowest priority wins
        resolver.set_strategy(
            "tools",
            ResolutionStrategy::Custom(ConflictComparator::new(|a, b| a.priority.cmp(&b.priority))),
        );
        let resolution = resolver.resolve(&intents(), &[0, 1], &[]);
        assert_eq!(resolution.winners, vec![0]);
    }

    #[test]
    fn test_continuing_intents_are_ranked_but_never_suppressed() {
        let resolver = ConflictResolver::default();
        // "low" is already live; the newcomer "high" outranks it and both proceed
        let resolution = resolver.resolve(&intents(), &[0, 1], &[0]);
        assert_eq!(resolution.winners, vec![0, 1]);
        assert!(resolution.suppressed.is_empty());

        // A live "high" still keeps the newcomer "low" out
        let resolution = resolver.resolve(&intents(), &[0, 1], &[1]);
        assert_eq!(resolution.winners, vec![1]);
        assert_eq!(resolution.suppressed, vec![0]);
    }

    #[test]
    fn test_strategy_serde() {
        let s: ResolutionStrategy = serde_json::from_str(r#"{"strategy":"top-k","k":3}"#).unwrap();
        assert!(matches!(s, ResolutionStrategy::TopK { k: 3 }));
        assert!(ResolutionStrategy::TopK { k: 0 }.validate().is_err());
    }
}
