//! Spatial grid used to bucket event positions into cells

use serde::{Deserialize, Serialize};

use crate::{
    error::{HandwaveError, Result},
    frame::Vec3,
};

/// A grid cell, zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
    pub layer: u32,
}

/// Grid over normalised image space (x, y in `[0, 1]`) with optional depth layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: u32,
    pub rows: u32,
    pub layers: u32,
    /// z range mapped onto the layers
    pub depth_range: (f32, f32),
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 6,
            layers: 1,
            depth_range: (-0.5, 0.5),
        }
    }
}

impl GridConfig {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            ..Default::default()
        }
    }

    pub fn with_layers(mut self, layers: u32, depth_range: (f32, f32)) -> Self {
        self.layers = layers;
        self.depth_range = depth_range;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 || self.layers == 0 {
            return Err(HandwaveError::invalid_parameter(
                "grid",
                "Columns, rows and layers must be greater than 0",
            ));
        }
        if !(self.depth_range.0 < self.depth_range.1) {
            return Err(HandwaveError::invalid_parameter(
                "depth_range",
                "Depth range must be increasing",
            ));
        }
        Ok(())
    }

    /// Cell containing `position`; out-of-range coordinates clamp to the border cells
    pub fn cell_for(&self, position: Vec3) -> Cell {
        let (near, far) = self.depth_range;
        let depth = if far > near { (position.z - near) / (far - near) } else { 0.0 };
        Cell {
            col: bucket(position.x, self.columns),
            row: bucket(position.y, self.rows),
            layer: bucket(depth, self.layers),
        }
    }
}

fn bucket(t: f32, count: u32) -> u32 {
    if count <= 1 || !t.is_finite() {
        return 0;
    }
    ((t.clamp(0.0, 1.0) * count as f32) as u32).min(count - 1)
}
