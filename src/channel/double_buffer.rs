//! Lock-free double-buffered frame channel
//!
//! One writer, one reader, two fixed slots and one atomic index. The writer always fills
//! the slot the index does *not* name and flips the index only once the slot is complete.
//! The reader samples the index once per attempt and decodes only that slot. Frames the
//! reader never sees are simply dropped; nothing queues.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use log::{trace, warn};

use crate::{
    error::{HandwaveError, Result},
    frame::FrameSnapshot,
    memory::SharedMemoryRegion,
    sync::{SequenceNumber, SlotSequence, SyncError},
};

use super::{
    codec::{decode_slot, encode_slot},
    config::ChannelConfig,
    layout::{slot_fields, ChannelLayout},
    stats::{ChannelStats, ChannelStatsSnapshot},
};

#[derive(Debug)]
struct ChannelShared {
    region: SharedMemoryRegion,
    layout: ChannelLayout,
    read_attempts: usize,
    stats: ChannelStats,
}

impl ChannelShared {
    fn active_index(&self) -> &AtomicU32 {
        // Offset 0 of a page-aligned mapping is 4-byte aligned
        unsafe { &*(self.region.base_ptr() as *const AtomicU32) }
    }

    fn slot_ptr(&self, slot: usize) -> *mut u8 {
        unsafe { self.region.base_ptr().add(self.layout.slot_offset(slot)) }
    }

    fn sequence(&self, slot: usize) -> SlotSequence<'_> {
        unsafe { SlotSequence::from_ptr(self.slot_ptr(slot).add(slot_fields::SEQUENCE)) }
    }

    /// Bytes of a slot for decoding.
    ///
    /// # Safety
    /// The caller must validate the slot sequence around any use of the returned slice.
    unsafe fn slot_bytes(&self, slot: usize) -> &[u8] {
        std::slice::from_raw_parts(self.slot_ptr(slot), self.layout.slot_size)
    }

    /// Mutable bytes of a slot.
    ///
    /// # Safety
    /// Only the single writer may call this, and only for the inactive slot.
    #[allow(clippy::mut_from_ref)]
    unsafe fn slot_bytes_mut(&self, slot: usize) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.slot_ptr(slot), self.layout.slot_size)
    }

    /// Total frames completed across both slots
    fn frames_written(&self) -> u64 {
        (0..2)
            .map(|slot| SlotSequence::completed_writes(self.sequence(slot).load_acquire()))
            .sum()
    }
}

/// Owner of a freshly created channel; split it to obtain the two endpoints
#[derive(Debug)]
pub struct FrameChannel {
    shared: Arc<ChannelShared>,
}

impl FrameChannel {
    /// Allocate the channel region. Fails immediately if the mapping cannot be provided.
    pub fn new(config: ChannelConfig) -> Result<Self> {
        let layout = ChannelLayout::new(&config)?;
        let region = SharedMemoryRegion::new(config.region_config(layout.total_size))?;

        if region.size() < layout.total_size {
            return Err(HandwaveError::memory(format!(
                "Channel needs {} bytes, region has {}",
                layout.total_size,
                region.size()
            )));
        }

        // A created file may hold bytes from an earlier run; an attached one is live
        if config.create {
            unsafe {
                std::ptr::write_bytes(region.base_ptr(), 0, layout.total_size);
            }
        }

        Ok(Self {
            shared: Arc::new(ChannelShared {
                region,
                layout,
                read_attempts: config.read_attempts,
                stats: ChannelStats::default(),
            }),
        })
    }

    /// Computed byte layout
    pub fn layout(&self) -> &ChannelLayout {
        &self.shared.layout
    }

    /// Split into the single writer and the single reader
    pub fn split(self) -> (FrameWriter, FrameReader) {
        let writer = FrameWriter {
            shared: Arc::clone(&self.shared),
            pending_slot: None,
        };
        let reader = FrameReader {
            shared: self.shared,
            last_seen: None,
        };
        (writer, reader)
    }
}

/// Producer endpoint. Not `Clone`: exactly one writer exists per channel.
#[derive(Debug)]
pub struct FrameWriter {
    shared: Arc<ChannelShared>,
    pending_slot: Option<usize>,
}

impl FrameWriter {
    /// Slot the reader currently sees
    pub fn active_index(&self) -> usize {
        self.shared.active_index().load(Ordering::Acquire) as usize & 1
    }

    /// Serialize `frame` into the inactive slot. Not visible until [`swap`](Self::swap).
    ///
    /// Frames exceeding the layout's cardinality are rejected before any byte is touched.
    pub fn write(&mut self, frame: &FrameSnapshot) -> Result<usize> {
        self.shared.layout.check_frame(frame)?;

        let slot = 1 - self.active_index();
        let sequence = self.shared.sequence(slot);

        let writing = sequence.begin_write();
        // Safety: single writer, and `slot` is not the published slot
        let bytes = unsafe { self.shared.slot_bytes_mut(slot) };
        encode_slot(&self.shared.layout, bytes, frame);
        sequence.end_write(writing);

        self.pending_slot = Some(slot);
        trace!("wrote frame t={} into slot {}", frame.timestamp, slot);
        Ok(slot)
    }

    /// Publish the last written slot. A swap without a preceding write does nothing.
    pub fn swap(&mut self) -> bool {
        match self.pending_slot.take() {
            Some(slot) => {
                self.shared.active_index().store(slot as u32, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Write then swap
    pub fn publish(&mut self, frame: &FrameSnapshot) -> Result<()> {
        self.write(frame)?;
        self.swap();
        Ok(())
    }

    /// Channel layout
    pub fn layout(&self) -> &ChannelLayout {
        &self.shared.layout
    }
}

/// Consumer endpoint. Not `Clone`: exactly one reader exists per channel.
#[derive(Debug)]
pub struct FrameReader {
    shared: Arc<ChannelShared>,
    last_seen: Option<(usize, SequenceNumber)>,
}

impl FrameReader {
    /// Slot currently published by the writer
    pub fn active_index(&self) -> usize {
        self.shared.active_index().load(Ordering::Acquire) as usize & 1
    }

    /// Decode the published slot, returning the frame and its (slot, sequence) identity.
    fn read_consistent(&self) -> Option<(FrameSnapshot, (usize, SequenceNumber))> {
        for _ in 0..self.shared.read_attempts {
            // The writer may have swapped since the last attempt, so re-pick the slot
            let slot = self.active_index();
            let decode = || decode_slot(&self.shared.layout, unsafe { self.shared.slot_bytes(slot) });
            match self.shared.sequence(slot).try_read(decode) {
                Ok((frame, seq)) => return Some((frame, (slot, seq))),
                Err(SyncError::SlotEmpty) => return None,
                Err(SyncError::WriterActive) | Err(SyncError::SequenceInconsistent { .. }) => {
                    self.shared.stats.record_retry();
                    std::hint::spin_loop();
                }
            }
        }

        self.shared.stats.record_failed_read();
        warn!(
            "no consistent frame after {} attempts; writer is lapping the reader",
            self.shared.read_attempts
        );
        None
    }

    /// Latest published frame, whether or not it was returned before.
    ///
    /// `None` before the first publish, or if every attempt raced a write.
    pub fn read(&mut self) -> Option<FrameSnapshot> {
        let (frame, identity) = self.read_consistent()?;
        if self.last_seen != Some(identity) {
            self.shared.stats.record_delivered();
            self.last_seen = Some(identity);
        }
        Some(frame)
    }

    /// Latest published frame only if it differs from the last one this reader returned
    pub fn poll(&mut self) -> Option<FrameSnapshot> {
        // Cheap pre-check so an unchanged slot is never decoded
        let slot = self.active_index();
        let seq = self.shared.sequence(slot).load_acquire();
        if self.last_seen == Some((slot, seq)) {
            return None;
        }

        let (frame, identity) = self.read_consistent()?;
        if self.last_seen == Some(identity) {
            return None;
        }
        self.last_seen = Some(identity);
        self.shared.stats.record_delivered();
        Some(frame)
    }

    /// Channel statistics, including frames dropped because the reader was slower
    pub fn stats(&self) -> ChannelStatsSnapshot {
        self.shared.stats.snapshot(self.shared.frames_written())
    }

    /// Channel layout
    pub fn layout(&self) -> &ChannelLayout {
        &self.shared.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Gesture, Handedness, RawHandDetection};

    fn frame(ts: f64, hands: usize) -> FrameSnapshot {
        let hand = RawHandDetection {
            handedness: Handedness::Right,
            handedness_score: 0.9,
            gesture: Gesture::OpenPalm,
            gesture_score: 0.8,
            ..Default::default()
        };
        FrameSnapshot::new(ts, vec![hand; hands], vec![])
    }

    #[test]
    fn test_nothing_before_first_publish() {
        let (_writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        assert!(reader.read().is_none());
        assert!(reader.poll().is_none());
    }

    #[test]
    fn test_write_is_invisible_until_swap() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();

        writer.publish(&frame(1.0, 1)).unwrap();
        assert_eq!(reader.poll().unwrap().timestamp, 1.0);

        let slot = writer.write(&frame(2.0, 1)).unwrap();
        assert_ne!(slot, reader.active_index());
        assert_eq!(reader.read().unwrap().timestamp, 1.0);

        assert!(writer.swap());
        assert_eq!(reader.poll().unwrap().timestamp, 2.0);
        assert!(!writer.swap());
    }

    #[test]
    fn test_poll_returns_each_frame_once() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        writer.publish(&frame(10.0, 2)).unwrap();

        assert!(reader.poll().is_some());
        assert!(reader.poll().is_none());
        assert_eq!(reader.read().unwrap().timestamp, 10.0);
    }

    #[test]
    fn test_fast_writer_drops_frames() {
        let (mut writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        for i in 0..5 {
            writer.publish(&frame(i as f64, 1)).unwrap();
        }
        assert_eq!(reader.poll().unwrap().timestamp, 4.0);

        let stats = reader.stats();
        assert_eq!(stats.frames_written, 5);
        assert_eq!(stats.frames_delivered, 1);
        assert_eq!(stats.frames_dropped, 4);
    }

    #[test]
    fn test_oversized_frame_rejected_without_publish() {
        let config = ChannelConfig::default().with_max_hands(2);
        let (mut writer, mut reader) = FrameChannel::new(config).unwrap().split();
        assert!(writer.publish(&frame(1.0, 3)).is_err());
        assert!(!writer.swap());
        assert!(reader.read().is_none());
    }
}
