//! Landmark velocity across frames

use crate::frame::{FrameSnapshot, Handedness, RawHandDetection, Vec3};

/// Identifies "the same hand" across frames.
///
/// Detectors do not keep hand order stable, so handedness wins over index when it is
/// known; the index is the tie-breaker and the fallback for unknown handedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandSelector {
    pub handedness: Handedness,
    pub index: usize,
}

impl HandSelector {
    pub fn new(handedness: Handedness, index: usize) -> Self {
        Self { handedness, index }
    }

    /// Locate the selected hand in `frame`
    pub fn find<'a>(&self, frame: &'a FrameSnapshot) -> Option<&'a RawHandDetection> {
        if self.handedness == Handedness::Unknown {
            return frame.hand(self.index);
        }
        match frame.hand(self.index) {
            Some(hand) if hand.handedness == self.handedness => Some(hand),
            _ => frame
                .hands
                .iter()
                .find(|hand| hand.handedness == self.handedness),
        }
    }

    /// Position of one landmark of the selected hand
    pub fn landmark(&self, frame: &FrameSnapshot, landmark: usize) -> Option<Vec3> {
        self.find(frame).and_then(|hand| hand.landmark(landmark))
    }
}

/// Per-axis displacement divided by elapsed seconds.
///
/// Zero or negative elapsed time yields the zero vector rather than NaN or infinity.
pub fn velocity_between(from: Vec3, from_ms: f64, to: Vec3, to_ms: f64) -> Vec3 {
    let elapsed_s = (to_ms - from_ms) / 1000.0;
    if elapsed_s <= 0.0 || !elapsed_s.is_finite() {
        return Vec3::ZERO;
    }
    to.sub(from).scale((1.0 / elapsed_s) as f32)
}
