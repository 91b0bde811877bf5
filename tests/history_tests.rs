//! Frame history integration tests
//! Bounded retention, window queries and motion measured through the engine

use std::sync::Arc;

use handwave::{
    frame::{landmarks, Gesture, Handedness, Landmark, RawHandDetection},
    history::HandSelector,
    pattern::gesture,
    EngineConfig, FrameHistory, FrameSnapshot, Intent, IntentEngine,
};

#[cfg(test)]
mod history_tests {
    use super::*;

    fn hand_at(handedness: Handedness, gesture: Gesture, x: f32) -> RawHandDetection {
        RawHandDetection {
            handedness,
            handedness_score: 0.9,
            gesture,
            gesture_score: 0.9,
            landmarks: vec![Landmark::new(x, 0.5, 0.0); 21],
            world_landmarks: vec![],
        }
    }

    fn fist_frame(ts: f64, fist: bool) -> Arc<FrameSnapshot> {
        let gesture = if fist { Gesture::ClosedFist } else { Gesture::OpenPalm };
        Arc::new(FrameSnapshot::new(ts, vec![hand_at(Handedness::Left, gesture, 0.5)], vec![]))
    }

    fn is_fist(frame: &FrameSnapshot) -> bool {
        frame.hands.iter().any(|h| h.gesture == Gesture::ClosedFist)
    }

    #[test]
    fn test_capacity_bounds_retention() {
        let mut history = FrameHistory::new(3).unwrap();
        let mut evicted = Vec::new();
        for i in 0..5 {
            if let Some(old) = history.push(fist_frame(i as f64, true)) {
                evicted.push(old.timestamp);
            }
        }
        assert_eq!(history.len(), 3);
        assert_eq!(evicted, vec![0.0, 1.0]);
        let kept: Vec<f64> = history.iter().map(|f| f.timestamp).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.frame_ago(2).unwrap().timestamp, 2.0);
        assert!(history.frame_ago(3).is_none());
        assert!(FrameHistory::new(0).is_err());
    }

    #[test]
    fn test_held_for_needs_full_coverage() {
        let mut history = FrameHistory::new(16).unwrap();
        history.push(fist_frame(0.0, true));
        history.push(fist_frame(50.0, true));
        assert!(!history.held_for(is_fist, 100.0));

        history.push(fist_frame(100.0, true));
        assert!(history.held_for(is_fist, 100.0));

        history.push(fist_frame(150.0, false));
        assert!(!history.held_for(is_fist, 100.0));
        assert_eq!(history.continuous_duration(is_fist), 0.0);
    }

    #[test]
    fn test_continuous_duration_stops_at_first_break() {
        let mut history = FrameHistory::new(16).unwrap();
        for (ts, fist) in [(0.0, true), (40.0, false), (80.0, true), (120.0, true), (160.0, true)] {
            history.push(fist_frame(ts, fist));
        }
        assert_eq!(history.continuous_duration(is_fist), 80.0);
        let window: Vec<f64> = history.frames_in_window(80.0).iter().map(|f| f.timestamp).collect();
        assert_eq!(window, vec![80.0, 120.0, 160.0]);
    }

    #[test]
    fn test_velocity_follows_handedness_across_reordering() {
        let mut history = FrameHistory::new(16).unwrap();
        // The detector swaps hand order between frames
        history.push(Arc::new(FrameSnapshot::new(
            0.0,
            vec![hand_at(Handedness::Left, Gesture::None, 0.2), hand_at(Handedness::Right, Gesture::None, 0.8)],
            vec![],
        )));
        history.push(Arc::new(FrameSnapshot::new(
            100.0,
            vec![hand_at(Handedness::Right, Gesture::None, 0.7), hand_at(Handedness::Left, Gesture::None, 0.3)],
            vec![],
        )));

        let left = history.average_velocity(HandSelector::new(Handedness::Left, 0), landmarks::WRIST, 200.0);
        let right = history.average_velocity(HandSelector::new(Handedness::Right, 1), landmarks::WRIST, 200.0);
        assert!((left.x - 1.0).abs() < 1e-4);
        assert!((right.x + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_engine_history_is_bounded_and_read_only() {
        let config = EngineConfig::default().with_history_capacity(4);
        let mut engine = IntentEngine::new(config).unwrap();
        engine
            .configure(vec![Intent::new("grab", gesture(Gesture::ClosedFist))])
            .unwrap();
        engine.start();

        for i in 0..10 {
            engine.process_frame(FrameSnapshot::clone(&fist_frame(i as f64 * 10.0, true)));
        }
        let snapshot = engine.frame_history();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot[0].timestamp, 60.0);
        assert_eq!(snapshot[3].timestamp, 90.0);
        assert_eq!(engine.history().latest().unwrap().timestamp, 90.0);

        engine.stop();
        assert!(engine.frame_history().is_empty());
        assert_eq!(snapshot.len(), 4);
    }
}
