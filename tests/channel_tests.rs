//! Frame channel integration tests
//! Cross-thread publication, torn-read protection and backing variants

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use handwave::{
    frame::{
        Gesture, Handedness, Landmark, RawFaceDetection, RawHandDetection, WorldLandmark,
        BLENDSHAPE_COUNT,
    },
    ChannelConfig, FrameChannel, FrameSnapshot,
};
use tempfile::TempDir;

#[cfg(test)]
mod channel_tests {
    use super::*;

    /// Every field of the frame is derived from `n`, so a torn read is detectable
    fn stamped_frame(n: u32) -> FrameSnapshot {
        let value = n as f32 / 1000.0;
        let hands = (n % 4 + 1) as usize;
        let hand = RawHandDetection {
            handedness: if n % 2 == 0 { Handedness::Left } else { Handedness::Right },
            handedness_score: value,
            gesture: Gesture::OpenPalm,
            gesture_score: value,
            landmarks: vec![Landmark::new(value, value, value); 21],
            world_landmarks: vec![],
        };
        FrameSnapshot::new(n as f64, vec![hand; hands], vec![])
    }

    fn assert_consistent(frame: &FrameSnapshot) {
        let n = frame.timestamp as u32;
        let value = n as f32 / 1000.0;
        assert_eq!(frame.hands.len(), (n % 4 + 1) as usize, "hand count torn at {}", n);
        for hand in &frame.hands {
            assert_eq!(hand.gesture_score, value, "score torn at {}", n);
            assert!(hand.landmarks.iter().all(|lm| lm.x == value && lm.z == value));
        }
    }

    #[test]
    fn test_full_frame_survives_the_channel() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();

        let mut blendshapes = vec![0.0; BLENDSHAPE_COUNT];
        blendshapes[9] = 0.75;
        let face = RawFaceDetection {
            landmarks: vec![Landmark::new(0.5, 0.3, -0.01); 478],
            blendshapes: Some(blendshapes),
            transformation_matrix: Some([1.0; 16]),
        };
        let hand = RawHandDetection {
            handedness: Handedness::Left,
            handedness_score: 0.97,
            gesture: Gesture::Victory,
            gesture_score: 0.81,
            landmarks: vec![Landmark::new(0.2, 0.4, 0.0).with_visibility(0.5); 21],
            world_landmarks: vec![WorldLandmark::new(0.01, 0.02, 0.03); 21],
        };
        let original = FrameSnapshot::new(1234.5, vec![hand], vec![face]);

        writer.publish(&original).unwrap();
        assert_eq!(reader.poll().unwrap(), original);
    }

    #[test]
    fn test_absent_optional_face_data_stays_absent() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        let face = RawFaceDetection {
            landmarks: vec![Landmark::new(0.5, 0.5, 0.0); 10],
            blendshapes: None,
            transformation_matrix: None,
        };
        writer.publish(&FrameSnapshot::new(1.0, vec![], vec![face])).unwrap();

        let frame = reader.poll().unwrap();
        assert_eq!(frame.faces.len(), 1);
        assert_eq!(frame.faces[0].landmarks.len(), 10);
        assert!(frame.faces[0].blendshapes.is_none());
        assert!(frame.faces[0].transformation_matrix.is_none());
        assert!(frame.hands.is_empty());
    }

    #[test]
    fn test_smaller_frame_does_not_leak_previous_entities() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        writer.publish(&stamped_frame(3)).unwrap();
        assert_eq!(reader.poll().unwrap().hands.len(), 4);

        // Both slots get written once more, so the old four-hand slot is reused
        writer.publish(&stamped_frame(4)).unwrap();
        writer.publish(&stamped_frame(8)).unwrap();
        let frame = reader.poll().unwrap();
        assert_eq!(frame.hands.len(), 1);
        assert_consistent(&frame);
    }

    #[test]
    fn test_file_backed_channel() {
        let temp_dir = TempDir::new().unwrap();
        let config = ChannelConfig::new("file_channel")
            .with_file_path(temp_dir.path().join("frames.shm"))
            .with_max_faces(0);
        let (mut writer, mut reader) = FrameChannel::new(config).unwrap().split();

        for n in 1..=3 {
            writer.publish(&stamped_frame(n)).unwrap();
            let frame = reader.poll().unwrap();
            assert_eq!(frame.timestamp, n as f64);
            assert_consistent(&frame);
        }
    }

    #[test]
    fn test_attached_channel_sees_the_creators_frames() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frames.shm");
        let config = ChannelConfig::new("shared_channel")
            .with_file_path(&path)
            .with_max_faces(0)
            .with_permissions(0o640);
        let (mut writer, _) = FrameChannel::new(config.clone()).unwrap().split();
        writer.publish(&stamped_frame(5)).unwrap();

        // Attaching keeps the published frame instead of zeroing the slots
        let (_, mut reader) = FrameChannel::new(config.clone().attach_existing()).unwrap().split();
        let frame = reader.poll().unwrap();
        assert_eq!(frame.timestamp, 5.0);
        assert_consistent(&frame);

        writer.publish(&stamped_frame(6)).unwrap();
        assert_eq!(reader.poll().unwrap().timestamp, 6.0);
        assert_eq!(reader.stats().frames_written, 2);

        let missing = config.with_file_path(temp_dir.path().join("missing.shm")).attach_existing();
        assert!(FrameChannel::new(missing).is_err());
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        assert!(FrameChannel::new(ChannelConfig::new("")).is_err());
        assert!(FrameChannel::new(ChannelConfig::default().with_max_hands(0)).is_err());
    }

    /// Test: a fast writer thread never exposes a half-written frame to the reader
    #[test]
    fn stress_concurrent_writer_and_reader() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default().with_max_faces(0))
            .unwrap()
            .split();
        let done = Arc::new(AtomicBool::new(false));
        let total = 20_000u32;

        let writer_done = Arc::clone(&done);
        let producer = thread::spawn(move || {
            for n in 1..=total {
                writer.publish(&stamped_frame(n)).unwrap();
            }
            writer_done.store(true, Ordering::Release);
        });

        let mut last = 0.0;
        let mut seen = 0u64;
        loop {
            let finished = done.load(Ordering::Acquire);
            if let Some(frame) = reader.poll() {
                assert_consistent(&frame);
                assert!(frame.timestamp > last, "time went backwards");
                last = frame.timestamp;
                seen += 1;
            }
            if finished && last == total as f64 {
                break;
            }
        }
        producer.join().unwrap();

        let stats = reader.stats();
        assert_eq!(stats.frames_written, total as u64);
        assert_eq!(stats.frames_delivered, seen);
        assert_eq!(stats.frames_delivered + stats.frames_dropped, stats.frames_written);
    }
}
