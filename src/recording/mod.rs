//! Recorded frame streams for deterministic replay

pub mod file;

pub use file::{FrameRecording, RecordingFormat};

use crate::{frame::FrameSnapshot, pipeline::FrameSource};

/// Feeds a recording to a producer, frame by frame
#[derive(Debug)]
pub struct RecordingSource {
    frames: std::vec::IntoIter<FrameSnapshot>,
}

impl From<FrameRecording> for RecordingSource {
    fn from(recording: FrameRecording) -> Self {
        Self {
            frames: recording.frames.into_iter(),
        }
    }
}

impl FrameSource for RecordingSource {
    type Item = FrameSnapshot;

    fn next_input(&mut self) -> Option<FrameSnapshot> {
        self.frames.next()
    }
}
