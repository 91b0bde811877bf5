//! Per-frame detection data model and the vocabularies shared with the wire format

pub mod types;
pub mod vocabulary;

pub use types::{FrameSnapshot, Landmark, RawFaceDetection, RawHandDetection, Vec3, WorldLandmark};
pub use vocabulary::{
    blendshape_index, landmarks, Finger, Gesture, Handedness, BLENDSHAPE_COUNT, BLENDSHAPE_NAMES,
    GESTURE_TABLE, HAND_LANDMARK_COUNT,
};
