//! Typed detection data carried by a frame

use serde::{Deserialize, Serialize};

use super::vocabulary::{
    blendshape_index, landmarks, Gesture, Handedness, BLENDSHAPE_COUNT, HAND_LANDMARK_COUNT,
};

/// A 3D vector in normalised image space (or metres for world landmarks)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(self, factor: f32) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Euclidean distance in 3D
    pub fn distance(self, other: Vec3) -> f32 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }

    /// Distance ignoring depth
    pub fn planar_distance(self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Vec3) -> Vec3 {
        self.add(other).scale(0.5)
    }

    /// Mean of a set of points; `None` when empty
    pub fn centroid<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Vec3> {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for p in points {
            sum = sum.add(p);
            count += 1;
        }
        (count > 0).then(|| sum.scale(1.0 / count as f32))
    }
}

/// A normalised landmark on a hand or face
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// World-space landmark (metres, hand-centred); carries no visibility
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// One detected hand in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHandDetection {
    pub handedness: Handedness,
    pub handedness_score: f32,
    pub gesture: Gesture,
    pub gesture_score: f32,
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub world_landmarks: Vec<WorldLandmark>,
}

impl RawHandDetection {
    /// Whether the full 21-point skeleton is present
    pub fn has_full_skeleton(&self) -> bool {
        self.landmarks.len() >= HAND_LANDMARK_COUNT
    }

    /// Position of one landmark, `None` if out of range
    pub fn landmark(&self, index: usize) -> Option<Vec3> {
        self.landmarks.get(index).map(Landmark::position)
    }

    /// Wrist position, used for velocity tracking
    pub fn wrist(&self) -> Option<Vec3> {
        self.landmark(landmarks::WRIST)
    }

    /// Centroid of the palm landmarks
    pub fn palm_center(&self) -> Option<Vec3> {
        if !self.has_full_skeleton() {
            return None;
        }
        Vec3::centroid(landmarks::PALM.iter().filter_map(|&i| self.landmark(i)))
    }
}

/// One detected face in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFaceDetection {
    pub landmarks: Vec<Landmark>,
    /// Coefficients indexed by [`BLENDSHAPE_NAMES`](super::vocabulary::BLENDSHAPE_NAMES)
    #[serde(default)]
    pub blendshapes: Option<Vec<f32>>,
    /// Row-major 4x4 facial transformation matrix
    #[serde(default)]
    pub transformation_matrix: Option<[f32; 16]>,
}

impl RawFaceDetection {
    /// Score of a named blendshape, `None` when absent or unknown
    pub fn blendshape(&self, name: &str) -> Option<f32> {
        let index = blendshape_index(name)?;
        self.blendshapes
            .as_ref()
            .filter(|b| b.len() == BLENDSHAPE_COUNT)
            .and_then(|b| b.get(index).copied())
    }

    /// Centroid of all face landmarks
    pub fn center(&self) -> Option<Vec3> {
        Vec3::centroid(self.landmarks.iter().map(Landmark::position))
    }
}

/// Immutable detection results for one detector tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Milliseconds, strictly increasing across a stream
    pub timestamp: f64,
    #[serde(default)]
    pub hands: Vec<RawHandDetection>,
    #[serde(default)]
    pub faces: Vec<RawFaceDetection>,
}

impl FrameSnapshot {
    pub fn new(timestamp: f64, hands: Vec<RawHandDetection>, faces: Vec<RawFaceDetection>) -> Self {
        Self {
            timestamp,
            hands,
            faces,
        }
    }

    /// Frame with no detections (used when the detector fails)
    pub fn empty(timestamp: f64) -> Self {
        Self {
            timestamp,
            hands: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn hand(&self, index: usize) -> Option<&RawHandDetection> {
        self.hands.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty() && self.faces.is_empty()
    }

    /// Index of the face whose centre is nearest (in x/y) to `point`
    pub fn nearest_face(&self, point: Vec3) -> Option<usize> {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(i, face)| face.center().map(|c| (i, c.planar_distance(point))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}
