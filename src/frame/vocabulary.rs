//! Fixed vocabularies shared by the channel writer and reader.
//!
//! Both sides of the wire must agree on these tables, so they are constants rather than
//! per-instance configuration. Changing an index here is a wire-format change.

use serde::{Deserialize, Serialize};

/// Number of landmarks in a complete hand skeleton
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Hand landmark indices (21-point hand skeleton)
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// Landmarks whose centroid approximates the palm centre
    pub const PALM: [usize; 5] = [WRIST, INDEX_FINGER_MCP, MIDDLE_FINGER_MCP, RING_FINGER_MCP, PINKY_MCP];
}

/// Handedness classification of a tracked hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Unknown,
    Left,
    Right,
}

impl Default for Handedness {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Handedness {
    /// Wire code written into the hand metadata block
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Left => 1,
            Self::Right => 2,
        }
    }

    /// Decode a wire code; unrecognised codes read back as `Unknown`
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Left,
            2 => Self::Right,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Canned hand gestures reported by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "Closed_Fist")]
    ClosedFist,
    #[serde(rename = "Open_Palm")]
    OpenPalm,
    #[serde(rename = "Pointing_Up")]
    PointingUp,
    #[serde(rename = "Thumb_Down")]
    ThumbDown,
    #[serde(rename = "Thumb_Up")]
    ThumbUp,
    #[serde(rename = "Victory")]
    Victory,
    #[serde(rename = "ILoveYou")]
    ILoveYou,
}

/// Gesture ↔ wire index table. Position in the array is the wire index.
pub const GESTURE_TABLE: [Gesture; 8] = [
    Gesture::None,
    Gesture::ClosedFist,
    Gesture::OpenPalm,
    Gesture::PointingUp,
    Gesture::ThumbDown,
    Gesture::ThumbUp,
    Gesture::Victory,
    Gesture::ILoveYou,
];

impl Default for Gesture {
    fn default() -> Self {
        Self::None
    }
}

impl Gesture {
    /// Detector-facing name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::ClosedFist => "Closed_Fist",
            Self::OpenPalm => "Open_Palm",
            Self::PointingUp => "Pointing_Up",
            Self::ThumbDown => "Thumb_Down",
            Self::ThumbUp => "Thumb_Up",
            Self::Victory => "Victory",
            Self::ILoveYou => "ILoveYou",
        }
    }

    /// Look up a gesture by detector name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        GESTURE_TABLE.iter().copied().find(|g| g.as_str() == name)
    }

    /// Index written on the wire
    pub fn wire_index(self) -> u8 {
        GESTURE_TABLE
            .iter()
            .position(|&g| g == self)
            .map(|i| i as u8)
            .unwrap_or(0)
    }

    /// Decode a wire index; out-of-range indices read back as `Gesture::None`
    pub fn from_wire_index(index: u8) -> Self {
        GESTURE_TABLE
            .get(index as usize)
            .copied()
            .unwrap_or(Gesture::None)
    }
}

/// Fingers that can pinch against the thumb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// Landmark index of the fingertip
    pub fn tip(self) -> usize {
        match self {
            Self::Index => landmarks::INDEX_FINGER_TIP,
            Self::Middle => landmarks::MIDDLE_FINGER_TIP,
            Self::Ring => landmarks::RING_FINGER_TIP,
            Self::Pinky => landmarks::PINKY_TIP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Pinky => "pinky",
        }
    }
}

/// Number of face blendshape coefficients
pub const BLENDSHAPE_COUNT: usize = 52;

/// Face blendshape names. Position in the array is the coefficient index on the wire.
pub const BLENDSHAPE_NAMES: [&str; BLENDSHAPE_COUNT] = [
    "_neutral",
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "eyeBlinkLeft",
    "eyeBlinkRight",
    "eyeLookDownLeft",
    "eyeLookDownRight",
    "eyeLookInLeft",
    "eyeLookInRight",
    "eyeLookOutLeft",
    "eyeLookOutRight",
    "eyeLookUpLeft",
    "eyeLookUpRight",
    "eyeSquintLeft",
    "eyeSquintRight",
    "eyeWideLeft",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawOpen",
    "jawRight",
    "mouthClose",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthFunnel",
    "mouthLeft",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthPucker",
    "mouthRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "noseSneerLeft",
    "noseSneerRight",
];

/// Index of a blendshape by name
pub fn blendshape_index(name: &str) -> Option<usize> {
    BLENDSHAPE_NAMES.iter().position(|&n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_table_is_bijective() {
        for (i, gesture) in GESTURE_TABLE.iter().enumerate() {
            assert_eq!(gesture.wire_index() as usize, i);
            assert_eq!(Gesture::from_wire_index(i as u8), *gesture);
            assert_eq!(Gesture::from_name(gesture.as_str()), Some(*gesture));
        }
    }

    #[test]
    fn test_unknown_gesture_inputs() {
        assert_eq!(Gesture::from_name("Jazz_Hands"), None);
        assert_eq!(Gesture::from_wire_index(200), Gesture::None);
    }

    #[test]
    fn test_handedness_codes() {
        for hand in [Handedness::Unknown, Handedness::Left, Handedness::Right] {
            assert_eq!(Handedness::from_code(hand.code()), hand);
        }
        assert_eq!(Handedness::from_code(9), Handedness::Unknown);
    }

    #[test]
    fn test_blendshape_lookup() {
        assert_eq!(blendshape_index("_neutral"), Some(0));
        assert_eq!(blendshape_index("jawOpen"), Some(25));
        assert_eq!(blendshape_index("noseSneerRight"), Some(BLENDSHAPE_COUNT - 1));
        assert_eq!(blendshape_index("smirk"), None);
    }

    #[test]
    fn test_gesture_serde_names() {
        let json = serde_json::to_string(&Gesture::ClosedFist).unwrap();
        assert_eq!(json, "\"Closed_Fist\"");
        let back: Gesture = serde_json::from_str("\"Pointing_Up\"").unwrap();
        assert_eq!(back, Gesture::PointingUp);
    }
}
