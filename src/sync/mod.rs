//! Synchronization primitives for the frame channel
//!
//! The channel is single-writer/single-reader and never blocks: the writer publishes by
//! flipping an atomic index, and readers validate each slot against its sequence word.

pub mod sequence;

pub use sequence::{SequenceNumber, SlotSequence};

/// Common synchronization error types
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Sequence changed while reading
    SequenceInconsistent { expected: u32, actual: u32 },
    /// The writer is currently filling the slot
    WriterActive,
    /// The slot has never been written
    SlotEmpty,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::SequenceInconsistent { expected, actual } => {
                write!(f, "Sequence inconsistent: expected {}, got {}", expected, actual)
            }
            SyncError::WriterActive => write!(f, "Slot is being written"),
            SyncError::SlotEmpty => write!(f, "Slot has never been written"),
        }
    }
}

impl std::error::Error for SyncError {}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
