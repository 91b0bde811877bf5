//! Recorded frame streams

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{HandwaveError, Result},
    frame::FrameSnapshot,
};

/// On-disk encoding of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFormat {
    /// Compact binary, used for captured sessions
    Bincode,
    /// One JSON frame per line, used for hand-written fixtures
    JsonLines,
}

impl RecordingFormat {
    /// `.jsonl`/`.ndjson`/`.json` read as JSON lines, anything else as bincode
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") | Some("ndjson") | Some("json") => Self::JsonLines,
            _ => Self::Bincode,
        }
    }
}

/// An ordered sequence of frames for deterministic replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRecording {
    pub frames: Vec<FrameSnapshot>,
}

impl FrameRecording {
    pub fn new(frames: Vec<FrameSnapshot>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: FrameSnapshot) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Milliseconds between the first and last frame
    pub fn duration_ms(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Timestamps must strictly increase
    pub fn validate(&self) -> Result<()> {
        for pair in self.frames.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(HandwaveError::invalid_parameter(
                    "timestamp",
                    format!(
                        "Frame at {} does not follow {}",
                        pair[1].timestamp, pair[0].timestamp
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bincode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Parse JSON lines; blank lines and `#` comments are skipped
    pub fn from_json_lines<R: BufRead>(reader: R) -> Result<Self> {
        let mut frames = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(trimmed).map_err(|e| {
                HandwaveError::serialization(format!("line {}: {}", number + 1, e))
            })?;
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<()> {
        for frame in &self.frames {
            serde_json::to_writer(&mut writer, frame)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| HandwaveError::from_io(e, &format!("Failed to open {}", path.display())))?;
        let recording = match RecordingFormat::from_path(path) {
            RecordingFormat::JsonLines => Self::from_json_lines(BufReader::new(file))?,
            RecordingFormat::Bincode => {
                let mut bytes = Vec::new();
                BufReader::new(file).read_to_end(&mut bytes)?;
                Self::from_bincode(&bytes)?
            }
        };
        debug!("loaded {} frames from {}", recording.len(), path.display());
        Ok(recording)
    }

    /// Save, picking the format from the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| HandwaveError::from_io(e, &format!("Failed to create {}", path.display())))?;
        let mut writer = BufWriter::new(file);
        match RecordingFormat::from_path(path) {
            RecordingFormat::JsonLines => self.write_json_lines(writer),
            RecordingFormat::Bincode => {
                writer.write_all(&self.to_bincode()?)?;
                writer.flush()?;
                Ok(())
            }
        }
    }
}
