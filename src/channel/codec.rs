//! Frame snapshot builder: typed frames to and from raw slot bytes
//!
//! The slot sequence word (first four bytes) is owned by the channel, not the codec;
//! `encode_slot` never touches it.

use crate::frame::{
    FrameSnapshot, Gesture, Handedness, Landmark, RawFaceDetection, RawHandDetection,
    WorldLandmark, BLENDSHAPE_COUNT, HAND_LANDMARK_COUNT,
};

use super::layout::{
    face_fields, hand_fields, slot_fields, ChannelLayout, LANDMARK_SIZE, MATRIX_LEN,
    WORLD_LANDMARK_SIZE,
};

#[inline]
fn put_f32(buf: &mut [u8], offset: usize, value: f32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn get_f32(buf: &[u8], offset: usize) -> f32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    f32::from_le_bytes(bytes)
}

#[inline]
fn put_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn get_f64(buf: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}

#[inline]
fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn get_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Visibility is optional on the wire: NaN encodes "absent"
fn put_landmark(buf: &mut [u8], offset: usize, lm: &Landmark) {
    put_f32(buf, offset, lm.x);
    put_f32(buf, offset + 4, lm.y);
    put_f32(buf, offset + 8, lm.z);
    put_f32(buf, offset + 12, lm.visibility.unwrap_or(f32::NAN));
}

fn get_landmark(buf: &[u8], offset: usize) -> Landmark {
    let visibility = get_f32(buf, offset + 12);
    Landmark {
        x: get_f32(buf, offset),
        y: get_f32(buf, offset + 4),
        z: get_f32(buf, offset + 8),
        visibility: (!visibility.is_nan()).then_some(visibility),
    }
}

/// Serialize `frame` into `slot` (everything but the sequence word).
///
/// The frame must already have passed [`ChannelLayout::check_frame`]. Entity slots beyond
/// the frame's counts are zero-filled so nothing from an earlier frame survives.
pub fn encode_slot(layout: &ChannelLayout, slot: &mut [u8], frame: &FrameSnapshot) {
    let hand_count = frame.hands.len().min(layout.max_hands);
    let face_count = frame.faces.len().min(layout.max_faces);

    slot[slot_fields::HAND_COUNT] = hand_count as u8;
    slot[slot_fields::FACE_COUNT] = face_count as u8;
    slot[slot_fields::FACE_COUNT + 1..slot_fields::TIMESTAMP].fill(0);
    put_f64(slot, slot_fields::TIMESTAMP, frame.timestamp);

    for index in 0..layout.max_faces {
        let start = layout.face_offset(index);
        let block = &mut slot[start..start + layout.face_size];
        match frame.faces.get(index).filter(|_| index < face_count) {
            Some(face) => encode_face(layout, block, face),
            None => block.fill(0),
        }
    }

    for index in 0..layout.max_hands {
        let start = layout.hand_offset(index);
        let block = &mut slot[start..start + layout.hand_size];
        match frame.hands.get(index).filter(|_| index < hand_count) {
            Some(hand) => encode_hand(block, hand),
            None => block.fill(0),
        }
    }
}

fn encode_hand(block: &mut [u8], hand: &RawHandDetection) {
    let lm_count = hand.landmarks.len().min(HAND_LANDMARK_COUNT);
    let world_count = hand.world_landmarks.len().min(HAND_LANDMARK_COUNT);

    block[..hand_fields::LANDMARKS].fill(0);
    block[hand_fields::HANDEDNESS] = hand.handedness.code();
    block[hand_fields::LANDMARK_COUNT] = lm_count as u8;
    block[hand_fields::WORLD_COUNT] = world_count as u8;
    put_f32(block, hand_fields::HANDEDNESS_SCORE, hand.handedness_score);
    block[hand_fields::GESTURE_INDEX] = hand.gesture.wire_index();
    put_f32(block, hand_fields::GESTURE_SCORE, hand.gesture_score);

    for (i, lm) in hand.landmarks.iter().take(lm_count).enumerate() {
        put_landmark(block, hand_fields::LANDMARKS + i * LANDMARK_SIZE, lm);
    }
    let unused_from = hand_fields::LANDMARKS + lm_count * LANDMARK_SIZE;
    block[unused_from..hand_fields::WORLD_LANDMARKS].fill(0);

    for (i, wl) in hand.world_landmarks.iter().take(world_count).enumerate() {
        let offset = hand_fields::WORLD_LANDMARKS + i * WORLD_LANDMARK_SIZE;
        put_f32(block, offset, wl.x);
        put_f32(block, offset + 4, wl.y);
        put_f32(block, offset + 8, wl.z);
    }
    let unused_from = hand_fields::WORLD_LANDMARKS + world_count * WORLD_LANDMARK_SIZE;
    block[unused_from..].fill(0);
}

fn encode_face(layout: &ChannelLayout, block: &mut [u8], face: &RawFaceDetection) {
    let lm_count = face.landmarks.len().min(layout.max_face_landmarks);
    let blendshapes = face
        .blendshapes
        .as_ref()
        .filter(|b| b.len() == BLENDSHAPE_COUNT);

    let mut flags = 0u8;
    if blendshapes.is_some() {
        flags |= face_fields::FLAG_BLENDSHAPES;
    }
    if face.transformation_matrix.is_some() {
        flags |= face_fields::FLAG_MATRIX;
    }

    block[..face_fields::LANDMARKS].fill(0);
    put_u16(block, face_fields::LANDMARK_COUNT, lm_count as u16);
    block[face_fields::FLAGS] = flags;

    for (i, lm) in face.landmarks.iter().take(lm_count).enumerate() {
        put_landmark(block, face_fields::LANDMARKS + i * LANDMARK_SIZE, lm);
    }
    let blend_offset = layout.blendshapes_offset();
    block[face_fields::LANDMARKS + lm_count * LANDMARK_SIZE..blend_offset].fill(0);

    match blendshapes {
        Some(scores) => {
            for (i, score) in scores.iter().enumerate() {
                put_f32(block, blend_offset + i * 4, *score);
            }
        }
        None => block[blend_offset..blend_offset + BLENDSHAPE_COUNT * 4].fill(0),
    }

    let matrix_offset = layout.matrix_offset();
    match &face.transformation_matrix {
        Some(matrix) => {
            for (i, value) in matrix.iter().enumerate() {
                put_f32(block, matrix_offset + i * 4, *value);
            }
        }
        None => block[matrix_offset..matrix_offset + MATRIX_LEN * 4].fill(0),
    }
}

/// Rebuild a typed frame from slot bytes.
///
/// Counts are read first and only that many entities are materialised. Counts larger
/// than the layout allows (a corrupted slot) are clamped.
pub fn decode_slot(layout: &ChannelLayout, slot: &[u8]) -> FrameSnapshot {
    let hand_count = (slot[slot_fields::HAND_COUNT] as usize).min(layout.max_hands);
    let face_count = (slot[slot_fields::FACE_COUNT] as usize).min(layout.max_faces);
    let timestamp = get_f64(slot, slot_fields::TIMESTAMP);

    let faces = (0..face_count)
        .map(|i| {
            let start = layout.face_offset(i);
            decode_face(layout, &slot[start..start + layout.face_size])
        })
        .collect();

    let hands = (0..hand_count)
        .map(|i| {
            let start = layout.hand_offset(i);
            decode_hand(&slot[start..start + layout.hand_size])
        })
        .collect();

    FrameSnapshot {
        timestamp,
        hands,
        faces,
    }
}

/// Read only the timestamp of a slot
pub fn slot_timestamp(slot: &[u8]) -> f64 {
    get_f64(slot, slot_fields::TIMESTAMP)
}

fn decode_hand(block: &[u8]) -> RawHandDetection {
    let lm_count = (block[hand_fields::LANDMARK_COUNT] as usize).min(HAND_LANDMARK_COUNT);
    let world_count = (block[hand_fields::WORLD_COUNT] as usize).min(HAND_LANDMARK_COUNT);

    let landmarks = (0..lm_count)
        .map(|i| get_landmark(block, hand_fields::LANDMARKS + i * LANDMARK_SIZE))
        .collect();
    let world_landmarks = (0..world_count)
        .map(|i| {
            let offset = hand_fields::WORLD_LANDMARKS + i * WORLD_LANDMARK_SIZE;
            WorldLandmark::new(
                get_f32(block, offset),
                get_f32(block, offset + 4),
                get_f32(block, offset + 8),
            )
        })
        .collect();

    RawHandDetection {
        handedness: Handedness::from_code(block[hand_fields::HANDEDNESS]),
        handedness_score: get_f32(block, hand_fields::HANDEDNESS_SCORE),
        gesture: Gesture::from_wire_index(block[hand_fields::GESTURE_INDEX]),
        gesture_score: get_f32(block, hand_fields::GESTURE_SCORE),
        landmarks,
        world_landmarks,
    }
}

fn decode_face(layout: &ChannelLayout, block: &[u8]) -> RawFaceDetection {
    let lm_count = (get_u16(block, face_fields::LANDMARK_COUNT) as usize).min(layout.max_face_landmarks);
    let flags = block[face_fields::FLAGS];

    let landmarks = (0..lm_count)
        .map(|i| get_landmark(block, face_fields::LANDMARKS + i * LANDMARK_SIZE))
        .collect();

    let blendshapes = (flags & face_fields::FLAG_BLENDSHAPES != 0).then(|| {
        let offset = layout.blendshapes_offset();
        (0..BLENDSHAPE_COUNT)
            .map(|i| get_f32(block, offset + i * 4))
            .collect()
    });

    let transformation_matrix = (flags & face_fields::FLAG_MATRIX != 0).then(|| {
        let offset = layout.matrix_offset();
        let mut matrix = [0.0f32; MATRIX_LEN];
        for (i, value) in matrix.iter_mut().enumerate() {
            *value = get_f32(block, offset + i * 4);
        }
        matrix
    });

    RawFaceDetection {
        landmarks,
        blendshapes,
        transformation_matrix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::config::ChannelConfig;

    fn layout() -> ChannelLayout {
        ChannelLayout::new(&ChannelConfig::default().with_max_face_landmarks(8)).unwrap()
    }

    fn hand(handedness: Handedness, gesture: Gesture) -> RawHandDetection {
        RawHandDetection {
            handedness,
            handedness_score: 0.93,
            gesture,
            gesture_score: 0.81,
            landmarks: (0..HAND_LANDMARK_COUNT)
                .map(|i| Landmark::new(i as f32 * 0.01, 0.5, -0.02).with_visibility(0.9))
                .collect(),
            world_landmarks: (0..HAND_LANDMARK_COUNT)
                .map(|i| WorldLandmark::new(0.0, i as f32 * 0.001, 0.0))
                .collect(),
        }
    }

    #[test]
    fn test_round_trip_hands_and_face() {
        let layout = layout();
        let mut slot = vec![0u8; layout.slot_size];
        let face = RawFaceDetection {
            landmarks: vec![Landmark::new(0.4, 0.3, 0.0); 5],
            blendshapes: Some(vec![0.25; BLENDSHAPE_COUNT]),
            transformation_matrix: Some([1.0; 16]),
        };
        let frame = FrameSnapshot::new(
            1234.5,
            vec![hand(Handedness::Left, Gesture::ClosedFist), hand(Handedness::Right, Gesture::Victory)],
            vec![face],
        );

        encode_slot(&layout, &mut slot, &frame);
        assert_eq!(decode_slot(&layout, &slot), frame);
        assert_eq!(slot_timestamp(&slot), 1234.5);
    }

    #[test]
    fn test_fewer_hands_zero_stale_slots() {
        let layout = layout();
        let mut slot = vec![0u8; layout.slot_size];

        let two = FrameSnapshot::new(
            1.0,
            vec![hand(Handedness::Left, Gesture::OpenPalm), hand(Handedness::Right, Gesture::ThumbUp)],
            vec![],
        );
        encode_slot(&layout, &mut slot, &two);

        let one = FrameSnapshot::new(2.0, vec![hand(Handedness::Right, Gesture::None)], vec![]);
        encode_slot(&layout, &mut slot, &one);

        let second = layout.hand_offset(1);
        assert!(slot[second..second + layout.hand_size].iter().all(|&b| b == 0));
        assert_eq!(decode_slot(&layout, &slot), one);
    }

    #[test]
    fn test_partial_skeleton_round_trips() {
        let layout = layout();
        let mut slot = vec![0u8; layout.slot_size];
        let mut partial = hand(Handedness::Unknown, Gesture::None);
        partial.landmarks.truncate(7);
        partial.world_landmarks.clear();
        let frame = FrameSnapshot::new(3.0, vec![partial], vec![]);

        encode_slot(&layout, &mut slot, &frame);
        let decoded = decode_slot(&layout, &slot);
        assert_eq!(decoded.hands[0].landmarks.len(), 7);
        assert!(decoded.hands[0].world_landmarks.is_empty());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_corrupt_counts_are_clamped() {
        let layout = layout();
        let mut slot = vec![0u8; layout.slot_size];
        slot[slot_fields::HAND_COUNT] = 200;
        slot[slot_fields::FACE_COUNT] = 200;
        let decoded = decode_slot(&layout, &slot);
        assert_eq!(decoded.hands.len(), layout.max_hands);
        assert_eq!(decoded.faces.len(), layout.max_faces);
    }
}
