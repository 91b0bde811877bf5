//! Per-slot sequence words for consistent reads of shared slots
//!
//! Each channel slot starts with a 32-bit sequence word living in the mapped region.
//! The writer makes it odd before touching the slot and even again once the slot is
//! complete. Readers sample the word before and after copying data out; a mismatch (or
//! an odd starting value) means the copy may be torn and must be retried.

use std::sync::atomic::{fence, AtomicU32, Ordering};

use super::{SyncError, SyncResult};

/// Sequence number type for slot generations
pub type SequenceNumber = u32;

/// Special sequence number values
pub mod special {
    use super::SequenceNumber;

    /// Slot has never been written
    pub const EMPTY: SequenceNumber = 0;
}

/// Borrowed view of a sequence word stored in shared memory
#[derive(Debug, Clone, Copy)]
pub struct SlotSequence<'a> {
    word: &'a AtomicU32,
}

impl<'a> SlotSequence<'a> {
    /// Wrap a sequence word
    pub fn new(word: &'a AtomicU32) -> Self {
        Self { word }
    }

    /// Build a view over a raw 4-byte aligned location.
    ///
    /// # Safety
    /// `ptr` must be non-null, 4-byte aligned, and valid for the lifetime `'a`.
    pub unsafe fn from_ptr(ptr: *mut u8) -> Self {
        Self {
            word: &*(ptr as *const AtomicU32),
        }
    }

    /// Load with acquire ordering
    pub fn load_acquire(&self) -> SequenceNumber {
        self.word.load(Ordering::Acquire)
    }

    /// Load with relaxed ordering
    pub fn load_relaxed(&self) -> SequenceNumber {
        self.word.load(Ordering::Relaxed)
    }

    /// Whether a sequence value denotes a slot being written
    pub fn is_writing(seq: SequenceNumber) -> bool {
        seq % 2 == 1
    }

    /// Whether a sequence value denotes a completed write
    pub fn is_ready(seq: SequenceNumber) -> bool {
        seq != special::EMPTY && seq % 2 == 0
    }

    /// Number of completed writes encoded in a sequence value
    pub fn completed_writes(seq: SequenceNumber) -> u64 {
        (seq / 2) as u64
    }

    /// Writer side: mark the slot as being written. Returns the value to pass to
    /// [`end_write`](Self::end_write).
    pub fn begin_write(&self) -> SequenceNumber {
        let current = self.word.load(Ordering::Relaxed);
        let writing = current.wrapping_add(1) | 1;
        self.word.store(writing, Ordering::Relaxed);
        // Data stores below may not be reordered before the odd marker
        fence(Ordering::Release);
        writing
    }

    /// Writer side: publish the slot contents
    pub fn end_write(&self, writing: SequenceNumber) -> SequenceNumber {
        let mut done = writing.wrapping_add(1);
        if done == special::EMPTY {
            done = 2;
        }
        self.word.store(done, Ordering::Release);
        done
    }

    /// Reader side: sample the sequence before copying
    pub fn begin_read(&self) -> SyncResult<SequenceNumber> {
        let seq = self.load_acquire();
        if seq == special::EMPTY {
            Err(SyncError::SlotEmpty)
        } else if Self::is_writing(seq) {
            Err(SyncError::WriterActive)
        } else {
            Ok(seq)
        }
    }

    /// Reader side: confirm nothing was written while copying
    pub fn end_read(&self, start_seq: SequenceNumber) -> SyncResult<SequenceNumber> {
        fence(Ordering::Acquire);
        let end_seq = self.load_relaxed();
        if end_seq != start_seq {
            Err(SyncError::SequenceInconsistent {
                expected: start_seq,
                actual: end_seq,
            })
        } else {
            Ok(end_seq)
        }
    }

    /// One guarded read: run `read_fn` between `begin_read` and `end_read`.
    ///
    /// Returns the value together with the sequence it was read under. `WriterActive` and
    /// `SequenceInconsistent` mean the value was discarded and the caller may retry.
    pub fn try_read<T, F>(&self, read_fn: F) -> SyncResult<(T, SequenceNumber)>
    where
        F: FnOnce() -> T,
    {
        let start_seq = self.begin_read()?;
        let data = read_fn();
        let seq = self.end_read(start_seq)?;
        Ok((data, seq))
    }
}
