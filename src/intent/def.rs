//! Intent declarations

use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{HandwaveError, Result},
    pattern::{Pattern, PatternDef},
};

use super::specificity::specificity;

/// Default grace period before an unmatched action ends
pub const DEFAULT_MAX_GAP_MS: f64 = 200.0;

/// Timing policy of an intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemporalConfig {
    /// How long the pattern must hold before the action starts
    pub min_duration_ms: f64,
    /// How long the pattern may stop holding before the action ends
    pub max_gap_ms: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 0.0,
            max_gap_ms: DEFAULT_MAX_GAP_MS,
        }
    }
}

/// Conflict group membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub group: String,
    #[serde(default)]
    pub priority: i32,
}

/// Serialized shape of an intent; specificity is never read from input
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntentDecl {
    id: String,
    pattern: PatternDef,
    #[serde(default)]
    temporal: TemporalConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution: Option<ResolutionConfig>,
}

/// A named pattern with timing and conflict policy. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IntentDecl", into = "IntentDecl")]
pub struct Intent {
    id: String,
    pattern: PatternDef,
    temporal: TemporalConfig,
    resolution: Option<ResolutionConfig>,
    specificity: u32,
}

impl From<IntentDecl> for Intent {
    fn from(decl: IntentDecl) -> Self {
        Intent::new(decl.id, decl.pattern)
            .with_temporal(decl.temporal)
            .with_resolution(decl.resolution)
    }
}

impl From<Intent> for IntentDecl {
    fn from(intent: Intent) -> Self {
        IntentDecl {
            id: intent.id,
            pattern: intent.pattern,
            temporal: intent.temporal,
            resolution: intent.resolution,
        }
    }
}

impl Intent {
    /// Create an intent; specificity is computed here, once
    pub fn new(id: impl Into<String>, pattern: impl Into<PatternDef>) -> Self {
        let pattern = pattern.into();
        Self {
            id: id.into(),
            specificity: specificity(&pattern),
            pattern,
            temporal: TemporalConfig::default(),
            resolution: None,
        }
    }

    pub fn with_temporal(mut self, temporal: TemporalConfig) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_min_duration(mut self, ms: f64) -> Self {
        self.temporal.min_duration_ms = ms;
        self
    }

    pub fn with_max_gap(mut self, ms: f64) -> Self {
        self.temporal.max_gap_ms = ms;
        self
    }

    /// Join a conflict group
    pub fn in_group(mut self, group: impl Into<String>, priority: i32) -> Self {
        self.resolution = Some(ResolutionConfig {
            group: group.into(),
            priority,
        });
        self
    }

    fn with_resolution(mut self, resolution: Option<ResolutionConfig>) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &PatternDef {
        &self.pattern
    }

    pub fn temporal(&self) -> &TemporalConfig {
        &self.temporal
    }

    pub fn resolution(&self) -> Option<&ResolutionConfig> {
        self.resolution.as_ref()
    }

    pub fn group(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.group.as_str())
    }

    pub fn priority(&self) -> i32 {
        self.resolution.as_ref().map_or(0, |r| r.priority)
    }

    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(HandwaveError::invalid_parameter("id", "Intent id cannot be empty"));
        }
        if self.id.contains(':') {
            return Err(HandwaveError::invalid_parameter(
                "id",
                format!("'{}' contains ':', which separates event phases", self.id),
            ));
        }
        let t = &self.temporal;
        if !(t.min_duration_ms.is_finite() && t.min_duration_ms >= 0.0) {
            return Err(HandwaveError::invalid_parameter(
                "minDurationMs",
                "Must be a non-negative duration",
            ));
        }
        if !(t.max_gap_ms.is_finite() && t.max_gap_ms >= 0.0) {
            return Err(HandwaveError::invalid_parameter(
                "maxGapMs",
                "Must be a non-negative duration",
            ));
        }
        if let Some(res) = &self.resolution {
            if res.group.is_empty() {
                return Err(HandwaveError::invalid_parameter("group", "Group name cannot be empty"));
            }
        }
        self.pattern.validate()
    }
}

impl From<(&str, Pattern)> for Intent {
    fn from((id, pattern): (&str, Pattern)) -> Self {
        Intent::new(id, pattern)
    }
}

/// The registered intent set, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentSet {
    intents: Vec<Intent>,
}

impl IntentSet {
    /// Build and validate a set
    pub fn new(intents: Vec<Intent>) -> Result<Self> {
        let set = Self { intents };
        set.validate()?;
        Ok(set)
    }

    /// Parse a JSON array of intents
    pub fn from_json(json: &str) -> Result<Self> {
        let set: IntentSet = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| HandwaveError::from_io(e, &format!("Failed to read {}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every intent valid and every id unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for intent in &self.intents {
            intent.validate()?;
            if !seen.insert(intent.id()) {
                return Err(HandwaveError::invalid_parameter(
                    "id",
                    format!("Duplicate intent id '{}'", intent.id()),
                ));
            }
        }
        Ok(())
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn into_intents(self) -> Vec<Intent> {
        self.intents
    }

    pub fn get(&self, id: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id() == id)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
