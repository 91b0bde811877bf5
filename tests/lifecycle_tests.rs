//! Action lifecycle integration tests
//! Temporal gating, gap tolerance, end reasons and event payloads through the engine

use handwave::{
    events::EventPhase,
    frame::{landmarks, Finger, Gesture, Handedness, Landmark, RawFaceDetection, RawHandDetection},
    intent::{ActionState, EndReason},
    pattern::{all_of, bidirectional, gesture, matches, pinch},
    EngineConfig, FrameSnapshot, Intent, IntentEngine, IntentEvent,
};

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    fn hand_at(handedness: Handedness, gesture: Gesture, score: f32, x: f32, y: f32) -> RawHandDetection {
        RawHandDetection {
            handedness,
            handedness_score: 0.95,
            gesture,
            gesture_score: score,
            landmarks: vec![Landmark::new(x, y, 0.0); 21],
            world_landmarks: vec![],
        }
    }

    fn hand(handedness: Handedness, gesture: Gesture, score: f32) -> RawHandDetection {
        hand_at(handedness, gesture, score, 0.5, 0.5)
    }

    /// Unclassified hand whose thumb and index tips are `distance` apart
    fn pinching(handedness: Handedness, distance: f32) -> RawHandDetection {
        let mut hand = hand(handedness, Gesture::None, 0.0);
        hand.landmarks[landmarks::THUMB_TIP] = Landmark::new(0.3, 0.5, 0.0);
        hand.landmarks[landmarks::INDEX_FINGER_TIP] = Landmark::new(0.3 + distance, 0.5, 0.0);
        hand
    }

    fn frame(ts: f64, hands: Vec<RawHandDetection>) -> FrameSnapshot {
        FrameSnapshot::new(ts, hands, vec![])
    }

    fn engine(intents: Vec<Intent>) -> IntentEngine {
        let mut engine = IntentEngine::new(EngineConfig::default()).unwrap();
        engine.configure(intents).unwrap();
        engine.start();
        engine
    }

    fn types(events: &[IntentEvent]) -> Vec<&str> {
        events.iter().map(|e| e.event_type.as_str()).collect()
    }

    #[test]
    fn test_min_duration_delays_start_until_second_frame() {
        let grab = Intent::new("grab", gesture(Gesture::ClosedFist).left()).with_min_duration(100.0);
        let mut engine = engine(vec![grab]);

        let first = engine.process_frame(frame(0.0, vec![hand(Handedness::Left, Gesture::ClosedFist, 0.8)]));
        assert!(first.is_empty());
        assert_eq!(engine.active_actions()[0].state, ActionState::Pending);

        let second = engine.process_frame(frame(100.0, vec![hand(Handedness::Left, Gesture::ClosedFist, 0.8)]));
        assert_eq!(types(&second), vec!["grab:start"]);
        assert_eq!(second[0].timestamp, 100.0);
        assert_eq!(second[0].id, "grab_left_0_0");
        assert!(second[0].duration.is_none());

        let third = engine.process_frame(frame(133.0, vec![hand(Handedness::Left, Gesture::ClosedFist, 0.8)]));
        assert_eq!(types(&third), vec!["grab:update"]);
        assert_eq!(third[0].duration, Some(133.0));
    }

    #[test]
    fn test_interrupted_pending_action_never_starts() {
        let grab = Intent::new("grab", gesture(Gesture::ClosedFist)).with_min_duration(100.0);
        let mut engine = engine(vec![grab]);

        let fist = || vec![hand(Handedness::Left, Gesture::ClosedFist, 0.8)];
        assert!(engine.process_frame(frame(0.0, fist())).is_empty());
        assert!(engine.process_frame(frame(50.0, vec![])).is_empty());
        assert!(engine.active_actions().is_empty());

        // The hold restarts from the new match
        assert!(engine.process_frame(frame(80.0, fist())).is_empty());
        assert!(engine.process_frame(frame(150.0, fist())).is_empty());
        assert_eq!(types(&engine.process_frame(frame(180.0, fist()))), vec!["grab:start"]);
    }

    #[test]
    fn test_confidence_threshold_is_inclusive() {
        let mut engine = engine(vec![Intent::new("grab", gesture(Gesture::ClosedFist))]);
        assert!(engine.process_frame(frame(0.0, vec![hand(Handedness::Left, Gesture::ClosedFist, 0.69)])).is_empty());
        let events = engine.process_frame(frame(10.0, vec![hand(Handedness::Left, Gesture::ClosedFist, 0.7)]));
        assert_eq!(types(&events), vec!["grab:start"]);
    }

    #[test]
    fn test_two_handed_composite_follows_both_sides() {
        let pattern = all_of([pinch(Finger::Index).left(), gesture(Gesture::PointingUp).right()]);
        let both = frame(0.0, vec![pinching(Handedness::Left, 0.04), hand(Handedness::Right, Gesture::PointingUp, 0.75)]);
        let released = frame(1.0, vec![pinching(Handedness::Left, 0.08), hand(Handedness::Right, Gesture::PointingUp, 0.75)]);
        let lowered = frame(2.0, vec![pinching(Handedness::Left, 0.04), hand(Handedness::Right, Gesture::PointingUp, 0.65)]);

        assert!(matches(&both, pattern.def()));
        assert!(!matches(&released, pattern.def()));
        assert!(!matches(&lowered, pattern.def()));

        let mut engine = engine(vec![Intent::new("aim", pattern)]);
        let start = engine.process_frame(both);
        assert_eq!(types(&start), vec!["aim:start"]);
        assert_eq!(start[0].hand, Handedness::Right);
        assert_eq!(start[0].hand_index, 1);
    }

    #[test]
    fn test_gap_tolerance_then_completed() {
        let pattern = all_of([pinch(Finger::Index).left(), gesture(Gesture::PointingUp).right()]);
        let mut engine = engine(vec![Intent::new("aim", pattern)]);
        let held = |ts| frame(ts, vec![pinching(Handedness::Left, 0.04), hand(Handedness::Right, Gesture::PointingUp, 0.9)]);
        let released = |ts| frame(ts, vec![pinching(Handedness::Left, 0.2), hand(Handedness::Right, Gesture::OpenPalm, 0.9)]);

        assert_eq!(types(&engine.process_frame(held(0.0))), vec!["aim:start"]);
        assert!(engine.process_frame(released(100.0)).is_empty());
        assert_eq!(engine.active_actions()[0].state, ActionState::Ending);
        assert!(engine.process_frame(released(200.0)).is_empty());

        let end = engine.process_frame(released(201.0));
        assert_eq!(types(&end), vec!["aim:end"]);
        assert_eq!(end[0].reason, Some(EndReason::Completed));
        assert_eq!(end[0].duration, Some(201.0));
        assert!(engine.active_actions().is_empty());
    }

    #[test]
    fn test_resume_inside_gap_keeps_the_action() {
        let mut engine = engine(vec![Intent::new("palm", gesture(Gesture::OpenPalm))]);
        let palm = |ts| frame(ts, vec![hand(Handedness::Right, Gesture::OpenPalm, 0.9)]);

        let start = engine.process_frame(palm(0.0));
        assert!(engine.process_frame(frame(150.0, vec![])).is_empty());
        let resumed = engine.process_frame(palm(300.0));
        assert_eq!(types(&resumed), vec!["palm:update"]);
        assert_eq!(resumed[0].id, start[0].id);
    }

    #[test]
    fn test_lost_hand_ends_with_timeout() {
        let mut engine = engine(vec![Intent::new("palm", gesture(Gesture::OpenPalm))]);
        engine.process_frame(frame(0.0, vec![hand(Handedness::Right, Gesture::OpenPalm, 0.9)]));
        let end = engine.process_frame(frame(250.0, vec![]));
        assert_eq!(end[0].phase, EventPhase::End);
        assert_eq!(end[0].reason, Some(EndReason::Timeout));
    }

    #[test]
    fn test_released_modifier_cancels() {
        let pattern = bidirectional(&gesture(Gesture::ClosedFist), &gesture(Gesture::PointingUp));
        let mut engine = engine(vec![Intent::new("draw", pattern)]);

        let start = engine.process_frame(frame(
            0.0,
            vec![hand(Handedness::Left, Gesture::ClosedFist, 0.9), hand(Handedness::Right, Gesture::PointingUp, 0.9)],
        ));
        assert_eq!(start[0].hand, Handedness::Right);

        // Modifier released, action gesture still held
        let still_pointing = vec![hand(Handedness::Left, Gesture::OpenPalm, 0.9), hand(Handedness::Right, Gesture::PointingUp, 0.9)];
        let end = engine.process_frame(frame(300.0, still_pointing));
        assert_eq!(end[0].reason, Some(EndReason::Cancelled));
    }

    #[test]
    fn test_released_action_completes() {
        let pattern = bidirectional(&gesture(Gesture::ClosedFist), &gesture(Gesture::PointingUp));
        let mut engine = engine(vec![Intent::new("draw", pattern)]);

        engine.process_frame(frame(
            0.0,
            vec![hand(Handedness::Right, Gesture::ClosedFist, 0.9), hand(Handedness::Left, Gesture::PointingUp, 0.9)],
        ));
        let end = engine.process_frame(frame(
            300.0,
            vec![hand(Handedness::Right, Gesture::ClosedFist, 0.9), hand(Handedness::Left, Gesture::OpenPalm, 0.9)],
        ));
        assert_eq!(end[0].hand, Handedness::Left);
        assert_eq!(end[0].reason, Some(EndReason::Completed));
    }

    #[test]
    fn test_each_hand_gets_its_own_action() {
        let mut engine = engine(vec![Intent::new("palm", gesture(Gesture::OpenPalm))]);
        let events = engine.process_frame(frame(
            0.0,
            vec![hand(Handedness::Left, Gesture::OpenPalm, 0.9), hand(Handedness::Right, Gesture::OpenPalm, 0.9)],
        ));
        let mut ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["palm_left_0_0", "palm_right_1_0"]);
        assert_eq!(engine.active_actions().len(), 2);
    }

    #[test]
    fn test_event_payload_tracks_motion() {
        let mut engine = engine(vec![Intent::new("palm", gesture(Gesture::OpenPalm))]);
        let mut last = Vec::new();
        for step in 0..5 {
            let x = 0.1 + step as f32 * 0.01;
            let face = RawFaceDetection {
                landmarks: vec![Landmark::new(0.9, 0.1, 0.0); 4],
                ..Default::default()
            };
            let snapshot = FrameSnapshot::new(
                step as f64 * 10.0,
                vec![hand_at(Handedness::Right, Gesture::OpenPalm, 0.9, x, 0.9)],
                vec![face],
            );
            last = engine.process_frame(snapshot);
        }

        let update = &last[0];
        assert_eq!(update.phase, EventPhase::Update);
        assert!(update.velocity.unwrap().x > 0.0);
        assert_eq!(update.velocity.unwrap().y, 0.0);
        assert_eq!(update.cell.col, 1);
        assert_eq!(update.cell.row, 5);
        assert_eq!(update.head_index, Some(0));
    }

    #[test]
    fn test_reconfigure_drops_removed_intents_silently() {
        let mut engine = engine(vec![Intent::new("palm", gesture(Gesture::OpenPalm))]);
        let (_, rx) = engine.events().subscribe_channel("*");
        engine.process_frame(frame(0.0, vec![hand(Handedness::Right, Gesture::OpenPalm, 0.9)]));

        engine.configure(vec![Intent::new("fist", gesture(Gesture::ClosedFist))]).unwrap();
        let events = engine.process_frame(frame(10.0, vec![hand(Handedness::Right, Gesture::OpenPalm, 0.9)]));
        assert!(events.is_empty());
        assert!(engine.active_actions().is_empty());
        assert_eq!(rx.try_iter().count(), 1);
    }
}
