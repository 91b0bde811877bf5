//! Engine configuration

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{HandwaveError, Result},
    history::DEFAULT_HISTORY_CAPACITY,
    intent::{GridConfig, ResolutionStrategy, DEFAULT_VELOCITY_WINDOW_MS},
};

/// Default silence after which every live action times out
pub const DEFAULT_TRACKING_TIMEOUT_MS: f64 = 500.0;

/// Consumer-side engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames kept in history
    pub history_capacity: usize,
    /// Window used for reported velocity
    pub velocity_window_ms: f64,
    /// No new frame for this long ends every action with `timeout`
    pub tracking_timeout_ms: f64,
    /// Grid used for event cells
    pub grid: GridConfig,
    /// Conflict strategy per resolution group; unlisted groups use winner-takes-all
    pub groups: HashMap<String, ResolutionStrategy>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            velocity_window_ms: DEFAULT_VELOCITY_WINDOW_MS,
            tracking_timeout_ms: DEFAULT_TRACKING_TIMEOUT_MS,
            grid: GridConfig::default(),
            groups: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_velocity_window(mut self, ms: f64) -> Self {
        self.velocity_window_ms = ms;
        self
    }

    pub fn with_tracking_timeout(mut self, ms: f64) -> Self {
        self.tracking_timeout_ms = ms;
        self
    }

    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_group_strategy(mut self, group: impl Into<String>, strategy: ResolutionStrategy) -> Self {
        self.groups.insert(group.into(), strategy);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(HandwaveError::invalid_parameter(
                "history_capacity",
                "History capacity must be greater than 0",
            ));
        }
        if !(self.velocity_window_ms.is_finite() && self.velocity_window_ms >= 0.0) {
            return Err(HandwaveError::invalid_parameter(
                "velocity_window_ms",
                "Must be a non-negative duration",
            ));
        }
        if !(self.tracking_timeout_ms > 0.0) {
            return Err(HandwaveError::invalid_parameter(
                "tracking_timeout_ms",
                "Must be a positive duration",
            ));
        }
        self.grid.validate()?;
        for strategy in self.groups.values() {
            strategy.validate()?;
        }
        Ok(())
    }
}
