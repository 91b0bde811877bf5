//! Fixed-capacity ring of recent frames and pure queries over it

use std::sync::Arc;

use crate::{
    error::{HandwaveError, Result},
    frame::{FrameSnapshot, Vec3},
};

use super::velocity::{velocity_between, HandSelector};

/// Default history depth: roughly ten seconds at 30 Hz
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// Append-only ring buffer of the most recent frames.
///
/// Frames are shared (`Arc`), never copied: the channel reader materialises a frame
/// once and every consumer refers to that allocation.
#[derive(Debug, Clone)]
pub struct FrameHistory {
    slots: Vec<Option<Arc<FrameSnapshot>>>,
    /// Index the next push writes to
    head: usize,
    len: usize,
}

impl Default for FrameHistory {
    fn default() -> Self {
        Self {
            slots: vec![None; DEFAULT_HISTORY_CAPACITY],
            head: 0,
            len: 0,
        }
    }
}

impl FrameHistory {
    /// Create a history holding at most `capacity` frames
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HandwaveError::invalid_parameter(
                "capacity",
                "History capacity must be greater than 0",
            ));
        }
        Ok(Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a frame, returning the evicted oldest frame when full
    pub fn push(&mut self, frame: Arc<FrameSnapshot>) -> Option<Arc<FrameSnapshot>> {
        let evicted = self.slots[self.head].replace(frame);
        self.head = (self.head + 1) % self.slots.len();
        if self.len < self.slots.len() {
            self.len += 1;
            None
        } else {
            evicted
        }
    }

    /// Drop every frame
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }

    /// Newest frame
    pub fn latest(&self) -> Option<&Arc<FrameSnapshot>> {
        self.frame_ago(0)
    }

    /// Frame `n` pushes before the newest (`0` is the newest)
    pub fn frame_ago(&self, n: usize) -> Option<&Arc<FrameSnapshot>> {
        if n >= self.len {
            return None;
        }
        let cap = self.slots.len();
        let index = (self.head + cap - 1 - n) % cap;
        self.slots[index].as_ref()
    }

    /// Newest to oldest
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &Arc<FrameSnapshot>> + '_ {
        (0..self.len).filter_map(move |n| self.frame_ago(n))
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FrameSnapshot>> + '_ {
        (0..self.len).rev().filter_map(move |n| self.frame_ago(n))
    }

    /// All frames, oldest first
    pub fn to_vec(&self) -> Vec<Arc<FrameSnapshot>> {
        self.iter().cloned().collect()
    }

    /// Frames with `timestamp >= latest - duration_ms`, oldest first (includes the newest)
    pub fn frames_in_window(&self, duration_ms: f64) -> Vec<Arc<FrameSnapshot>> {
        let Some(latest) = self.latest() else {
            return Vec::new();
        };
        let start = latest.timestamp - duration_ms;
        let mut frames: Vec<_> = self
            .iter_newest_first()
            .take_while(|f| f.timestamp >= start)
            .cloned()
            .collect();
        frames.reverse();
        frames
    }

    /// True only if history covers the whole window and every frame inside it satisfies
    /// `predicate`. Insufficient history is never true by default.
    pub fn held_for<P>(&self, mut predicate: P, duration_ms: f64) -> bool
    where
        P: FnMut(&FrameSnapshot) -> bool,
    {
        let (Some(latest), Some(oldest)) = (self.latest(), self.frame_ago(self.len.saturating_sub(1))) else {
            return false;
        };
        let start = latest.timestamp - duration_ms;
        if oldest.timestamp > start {
            return false;
        }
        self.iter_newest_first()
            .take_while(|f| f.timestamp >= start)
            .all(|f| predicate(f))
    }

    /// Milliseconds the predicate has held, walking back from the newest frame.
    /// Zero when the newest frame fails.
    pub fn continuous_duration<P>(&self, mut predicate: P) -> f64
    where
        P: FnMut(&FrameSnapshot) -> bool,
    {
        let Some(latest) = self.latest() else {
            return 0.0;
        };
        let mut earliest = None;
        for frame in self.iter_newest_first() {
            if !predicate(frame) {
                break;
            }
            earliest = Some(frame.timestamp);
        }
        earliest.map_or(0.0, |t| latest.timestamp - t)
    }

    /// Velocity of one landmark between two frames (units per second)
    pub fn velocity_between_frames(
        &self,
        older: &FrameSnapshot,
        newer: &FrameSnapshot,
        hand: HandSelector,
        landmark: usize,
    ) -> Vec3 {
        match (hand.landmark(older, landmark), hand.landmark(newer, landmark)) {
            (Some(a), Some(b)) => velocity_between(a, older.timestamp, b, newer.timestamp),
            _ => Vec3::ZERO,
        }
    }

    /// Average velocity of one landmark across the window: displacement between the
    /// oldest and newest in-window frames that contain the hand, over their time span.
    pub fn average_velocity(&self, hand: HandSelector, landmark: usize, window_ms: f64) -> Vec3 {
        let frames = self.frames_in_window(window_ms);
        let mut tracked = frames
            .iter()
            .filter_map(|f| hand.landmark(f, landmark).map(|p| (p, f.timestamp)));
        let Some(first) = tracked.next() else {
            return Vec3::ZERO;
        };
        match tracked.last() {
            Some(last) => velocity_between(first.0, first.1, last.0, last.1),
            None => Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Gesture, Handedness, Landmark, RawHandDetection};

    fn frame(ts: f64) -> Arc<FrameSnapshot> {
        Arc::new(FrameSnapshot::empty(ts))
    }

    fn history(timestamps: &[f64], capacity: usize) -> FrameHistory {
        let mut history = FrameHistory::new(capacity).unwrap();
        for &ts in timestamps {
            history.push(frame(ts));
        }
        history
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = FrameHistory::new(3).unwrap();
        assert!(history.push(frame(0.0)).is_none());
        history.push(frame(1.0));
        history.push(frame(2.0));
        let evicted = history.push(frame(3.0)).unwrap();
        assert_eq!(evicted.timestamp, 0.0);
        assert_eq!(history.len(), 3);
        let order: Vec<f64> = history.iter().map(|f| f.timestamp).collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_frame_ago() {
        let history = history(&[10.0, 20.0, 30.0], 8);
        assert_eq!(history.frame_ago(0).unwrap().timestamp, 30.0);
        assert_eq!(history.frame_ago(2).unwrap().timestamp, 10.0);
        assert!(history.frame_ago(3).is_none());
        assert!(FrameHistory::default().latest().is_none());
    }

    #[test]
    fn test_frames_in_window_is_inclusive() {
        let history = history(&[0.0, 50.0, 100.0, 150.0], 8);
        let window: Vec<f64> = history.frames_in_window(100.0).iter().map(|f| f.timestamp).collect();
        assert_eq!(window, vec![50.0, 100.0, 150.0]);
        assert_eq!(history.frames_in_window(0.0).len(), 1);
    }

    #[test]
    fn test_held_for_requires_coverage() {
        let history = history(&[100.0, 150.0], 8);
        // Every frame passes but only 50ms of history exists
        assert!(!history.held_for(|_| true, 100.0));
        assert!(history.held_for(|_| true, 50.0));
        assert!(!history.held_for(|f| f.timestamp > 120.0, 50.0));
        assert!(!FrameHistory::default().held_for(|_| true, 0.0));
    }

    #[test]
    fn test_continuous_duration() {
        let history = history(&[0.0, 40.0, 80.0, 120.0], 8);
        assert_eq!(history.continuous_duration(|f| f.timestamp >= 40.0), 80.0);
        assert_eq!(history.continuous_duration(|f| f.timestamp < 100.0), 0.0);
        assert_eq!(history.continuous_duration(|_| true), 120.0);
    }

    #[test]
    fn test_average_velocity() {
        let mut history = FrameHistory::new(8).unwrap();
        for (i, x) in [0.1f32, 0.2, 0.3].iter().enumerate() {
            let hand = RawHandDetection {
                handedness: Handedness::Left,
                handedness_score: 1.0,
                gesture: Gesture::None,
                gesture_score: 0.0,
                landmarks: vec![Landmark::new(*x, 0.5, 0.0)],
                world_landmarks: vec![],
            };
            history.push(Arc::new(FrameSnapshot::new(i as f64 * 100.0, vec![hand], vec![])));
        }
        let v = history.average_velocity(HandSelector::new(Handedness::Left, 0), 0, 200.0);
        assert!((v.x - 1.0).abs() < 1e-4);
        assert_eq!(v.y, 0.0);

        let none = history.average_velocity(HandSelector::new(Handedness::Right, 0), 0, 200.0);
        assert_eq!(none, Vec3::ZERO);
    }
}
