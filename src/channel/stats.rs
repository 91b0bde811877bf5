//! Channel statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Reader-side counters. Frames written are derived from the slot sequences instead of
/// being counted separately, so the writer's hot path stays free of extra atomics.
#[derive(Debug, Default)]
pub struct ChannelStats {
    frames_delivered: AtomicU64,
    torn_read_retries: AtomicU64,
    failed_reads: AtomicU64,
}

impl ChannelStats {
    /// A distinct frame was handed to the consumer
    pub fn record_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// A read attempt raced the writer and was retried
    pub fn record_retry(&self) {
        self.torn_read_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Every attempt of a read raced the writer
    pub fn record_failed_read(&self) {
        self.failed_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self, frames_written: u64) -> ChannelStatsSnapshot {
        let frames_delivered = self.frames_delivered.load(Ordering::Relaxed);
        ChannelStatsSnapshot {
            frames_written,
            frames_delivered,
            frames_dropped: frames_written.saturating_sub(frames_delivered),
            torn_read_retries: self.torn_read_retries.load(Ordering::Relaxed),
            failed_reads: self.failed_reads.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of channel statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelStatsSnapshot {
    /// Frames completed by the writer
    pub frames_written: u64,
    /// Distinct frames returned to the reader
    pub frames_delivered: u64,
    /// Frames overwritten before the reader saw them
    pub frames_dropped: u64,
    /// Read attempts retried because of a concurrent write
    pub torn_read_retries: u64,
    /// Reads that gave up after exhausting their attempts
    pub failed_reads: u64,
}

impl ChannelStatsSnapshot {
    /// Fraction of written frames the reader never observed
    pub fn drop_rate(&self) -> f64 {
        if self.frames_written == 0 {
            0.0
        } else {
            self.frames_dropped as f64 / self.frames_written as f64
        }
    }
}
