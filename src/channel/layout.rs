//! Fixed byte layout of the frame channel
//!
//! ```text
//! [activeIndex: u32]
//! [slot 0: metadata(16) | faces(maxFaces × faceSize) | hands(maxHands × handSize)]
//! [slot 1: same]
//!
//! slot metadata : [sequence:u32][handCount:u8][faceCount:u8][pad:2][timestamp:f64]
//! hand metadata : [handedness:u8][lmCount:u8][worldCount:u8][pad:1][handednessScore:f32]
//!                 [gestureIndex:u8][pad:3][gestureScore:f32]
//! hand body     : 21 × landmark(x,y,z,visibility: f32) | 21 × world(x,y,z: f32)
//! face metadata : [landmarkCount:u16][flags:u8][pad:13]
//! face body     : maxFaceLandmarks × landmark | 52 × blendshape f32 | 16 × matrix f32
//! ```
//!
//! All multi-byte values are little-endian. Every block size is a multiple of four so
//! each slot's sequence word stays 4-byte aligned.

use serde::Serialize;

use crate::{
    error::{HandwaveError, Result},
    frame::{FrameSnapshot, BLENDSHAPE_COUNT, HAND_LANDMARK_COUNT},
};

use super::config::ChannelConfig;

/// Size of the active-slot index word
pub const ACTIVE_INDEX_SIZE: usize = 4;
/// Size of the per-slot metadata block
pub const SLOT_METADATA_SIZE: usize = 16;
/// Size of the per-hand metadata block
pub const HAND_METADATA_SIZE: usize = 16;
/// Size of the per-face metadata block
pub const FACE_METADATA_SIZE: usize = 16;
/// Bytes per normalised landmark (x, y, z, visibility)
pub const LANDMARK_SIZE: usize = 16;
/// Bytes per world landmark (x, y, z)
pub const WORLD_LANDMARK_SIZE: usize = 12;
/// Number of floats in the facial transformation matrix
pub const MATRIX_LEN: usize = 16;
/// Bytes per hand block
pub const HAND_SIZE: usize =
    HAND_METADATA_SIZE + HAND_LANDMARK_COUNT * LANDMARK_SIZE + HAND_LANDMARK_COUNT * WORLD_LANDMARK_SIZE;

/// Offsets inside the slot metadata block
pub mod slot_fields {
    pub const SEQUENCE: usize = 0;
    pub const HAND_COUNT: usize = 4;
    pub const FACE_COUNT: usize = 5;
    pub const TIMESTAMP: usize = 8;
}

/// Offsets inside a hand block
pub mod hand_fields {
    pub const HANDEDNESS: usize = 0;
    pub const LANDMARK_COUNT: usize = 1;
    pub const WORLD_COUNT: usize = 2;
    pub const HANDEDNESS_SCORE: usize = 4;
    pub const GESTURE_INDEX: usize = 8;
    pub const GESTURE_SCORE: usize = 12;
    pub const LANDMARKS: usize = super::HAND_METADATA_SIZE;
    pub const WORLD_LANDMARKS: usize =
        LANDMARKS + crate::frame::HAND_LANDMARK_COUNT * super::LANDMARK_SIZE;
}

/// Offsets and flags inside a face block
pub mod face_fields {
    pub const LANDMARK_COUNT: usize = 0;
    pub const FLAGS: usize = 2;
    pub const LANDMARKS: usize = super::FACE_METADATA_SIZE;

    pub const FLAG_BLENDSHAPES: u8 = 0b01;
    pub const FLAG_MATRIX: u8 = 0b10;
}

/// Computed geometry of a channel instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelLayout {
    pub max_hands: usize,
    pub max_faces: usize,
    pub max_face_landmarks: usize,
    pub hand_size: usize,
    pub face_size: usize,
    pub slot_size: usize,
    pub total_size: usize,
}

impl ChannelLayout {
    /// Compute the layout for a validated configuration
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        config.validate()?;

        let face_size = FACE_METADATA_SIZE
            + config.max_face_landmarks * LANDMARK_SIZE
            + BLENDSHAPE_COUNT * 4
            + MATRIX_LEN * 4;
        let slot_size =
            SLOT_METADATA_SIZE + config.max_faces * face_size + config.max_hands * HAND_SIZE;
        let total_size = ACTIVE_INDEX_SIZE + 2 * slot_size;

        debug_assert_eq!(slot_size % 4, 0);

        Ok(Self {
            max_hands: config.max_hands,
            max_faces: config.max_faces,
            max_face_landmarks: config.max_face_landmarks,
            hand_size: HAND_SIZE,
            face_size,
            slot_size,
            total_size,
        })
    }

    /// Byte offset of slot 0 or 1 from the start of the region
    pub fn slot_offset(&self, slot: usize) -> usize {
        ACTIVE_INDEX_SIZE + slot * self.slot_size
    }

    /// Offset of face `index` within a slot
    pub fn face_offset(&self, index: usize) -> usize {
        SLOT_METADATA_SIZE + index * self.face_size
    }

    /// Offset of hand `index` within a slot
    pub fn hand_offset(&self, index: usize) -> usize {
        SLOT_METADATA_SIZE + self.max_faces * self.face_size + index * self.hand_size
    }

    /// Offset of the blendshape block within a face block
    pub fn blendshapes_offset(&self) -> usize {
        FACE_METADATA_SIZE + self.max_face_landmarks * LANDMARK_SIZE
    }

    /// Offset of the matrix block within a face block
    pub fn matrix_offset(&self) -> usize {
        self.blendshapes_offset() + BLENDSHAPE_COUNT * 4
    }

    /// Reject frames that do not fit this layout, before any byte is written
    pub fn check_frame(&self, frame: &FrameSnapshot) -> Result<()> {
        if frame.hands.len() > self.max_hands {
            return Err(HandwaveError::capacity("hands", frame.hands.len(), self.max_hands));
        }
        if frame.faces.len() > self.max_faces {
            return Err(HandwaveError::capacity("faces", frame.faces.len(), self.max_faces));
        }
        for hand in &frame.hands {
            if hand.landmarks.len() > HAND_LANDMARK_COUNT {
                return Err(HandwaveError::capacity(
                    "hand landmarks",
                    hand.landmarks.len(),
                    HAND_LANDMARK_COUNT,
                ));
            }
            if hand.world_landmarks.len() > HAND_LANDMARK_COUNT {
                return Err(HandwaveError::capacity(
                    "hand world landmarks",
                    hand.world_landmarks.len(),
                    HAND_LANDMARK_COUNT,
                ));
            }
        }
        for face in &frame.faces {
            if face.landmarks.len() > self.max_face_landmarks {
                return Err(HandwaveError::capacity(
                    "face landmarks",
                    face.landmarks.len(),
                    self.max_face_landmarks,
                ));
            }
            if let Some(blendshapes) = &face.blendshapes {
                if blendshapes.len() != BLENDSHAPE_COUNT {
                    return Err(HandwaveError::invalid_parameter(
                        "blendshapes",
                        format!("expected {} coefficients, got {}", BLENDSHAPE_COUNT, blendshapes.len()),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawHandDetection;

    #[test]
    fn test_default_layout_sizes() {
        let layout = ChannelLayout::new(&ChannelConfig::default()).unwrap();
        assert_eq!(layout.hand_size, 604);
        assert_eq!(layout.face_size, 16 + 478 * 16 + 52 * 4 + 64);
        assert_eq!(layout.slot_size, 16 + 2 * layout.face_size + 4 * 604);
        assert_eq!(layout.total_size, 4 + 2 * layout.slot_size);
        assert_eq!(layout.slot_offset(1) % 4, 0);
    }

    #[test]
    fn test_hands_follow_faces() {
        let layout = ChannelLayout::new(&ChannelConfig::default()).unwrap();
        assert_eq!(layout.face_offset(0), SLOT_METADATA_SIZE);
        assert_eq!(layout.hand_offset(0), SLOT_METADATA_SIZE + 2 * layout.face_size);
        assert_eq!(layout.hand_offset(3) + HAND_SIZE, layout.slot_size);
    }

    #[test]
    fn test_check_frame_cardinality() {
        let layout = ChannelLayout::new(&ChannelConfig::default().with_max_hands(1)).unwrap();
        let hands = vec![RawHandDetection::default(), RawHandDetection::default()];
        let frame = FrameSnapshot::new(0.0, hands, vec![]);
        assert!(matches!(
            layout.check_frame(&frame),
            Err(HandwaveError::Capacity { requested: 2, available: 1, .. })
        ));
    }
}
