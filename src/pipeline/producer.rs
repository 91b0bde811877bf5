//! Producer side: detector thread writing into the frame channel
//!
//! The producer runs as fast as its source and detector allow. It never waits for the
//! consumer; frames the consumer misses are overwritten in the channel.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    channel::FrameWriter,
    error::{HandwaveError, Result},
    frame::FrameSnapshot,
};

use super::clock::MonotonicClock;

/// External vision detector: a pure function from one input to one frame
pub trait Detector: Send {
    type Input;

    /// Detect hands and faces in `input`. The returned frame should carry `timestamp_ms`.
    fn detect(&mut self, input: &Self::Input, timestamp_ms: f64) -> Result<FrameSnapshot>;
}

/// Supplier of detector inputs (camera frames, recorded snapshots, ...)
pub trait FrameSource: Send {
    type Item;

    /// Next input, `None` once the source is exhausted
    fn next_input(&mut self) -> Option<Self::Item>;
}

/// Any sendable iterator is a source
pub struct IterSource<I>(pub I);

impl<I> FrameSource for IterSource<I>
where
    I: Iterator + Send,
{
    type Item = I::Item;

    fn next_input(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// Detector for inputs that already are frames (recordings, tests).
///
/// Frames are restamped with the producer's timestamp so tracking timeouts in a live
/// pipeline compare against one clock. Use [`replay`](super::replay) to keep recorded times.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDetector;

impl Detector for PassthroughDetector {
    type Input = FrameSnapshot;

    fn detect(&mut self, input: &FrameSnapshot, timestamp_ms: f64) -> Result<FrameSnapshot> {
        let mut frame = input.clone();
        frame.timestamp = timestamp_ms;
        Ok(frame)
    }
}

/// Producer thread configuration
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub thread_name: String,
    /// Minimum time between frames; `None` runs uncapped
    pub frame_interval: Option<Duration>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            thread_name: "handwave-producer".to_string(),
            frame_interval: None,
        }
    }
}

impl ProducerConfig {
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }
}

/// Counters shared between a producer thread and its handle
#[derive(Debug, Default)]
pub struct ProducerCounters {
    frames_published: AtomicU64,
    detector_errors: AtomicU64,
    rejected_frames: AtomicU64,
}

/// Producer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProducerStats {
    pub frames_published: u64,
    /// Frames replaced by an empty frame because the detector failed
    pub detector_errors: u64,
    /// Frames the channel layout could not hold
    pub rejected_frames: u64,
}

impl ProducerCounters {
    fn snapshot(&self) -> ProducerStats {
        ProducerStats {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            detector_errors: self.detector_errors.load(Ordering::Relaxed),
            rejected_frames: self.rejected_frames.load(Ordering::Relaxed),
        }
    }
}

/// Source, detector and writer of one producer, type-erased so a stopped producer can be
/// handed back and spawned again
pub trait ProducerTask: Send {
    /// Run until `running` clears or the source is exhausted
    fn run(&mut self, epoch: Instant, interval: Option<Duration>, running: &AtomicBool, counters: &ProducerCounters);
}

struct DetectorTask<S, D> {
    source: S,
    detector: D,
    writer: FrameWriter,
}

impl<S, D> ProducerTask for DetectorTask<S, D>
where
    S: FrameSource,
    D: Detector<Input = S::Item>,
{
    fn run(&mut self, epoch: Instant, interval: Option<Duration>, running: &AtomicBool, counters: &ProducerCounters) {
        let mut input_clock = MonotonicClock::new();
        let mut output_clock = MonotonicClock::new();

        while running.load(Ordering::Acquire) {
            let tick_started = Instant::now();
            let Some(input) = self.source.next_input() else {
                debug!("producer source exhausted");
                break;
            };

            let timestamp = input_clock.next(epoch.elapsed().as_secs_f64() * 1000.0);
            let detector = &mut self.detector;
            let detected = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&input, timestamp)));
            let mut frame = match detected {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) => {
                    warn!("detector failed at t={}: {}", timestamp, e);
                    counters.detector_errors.fetch_add(1, Ordering::Relaxed);
                    FrameSnapshot::empty(timestamp)
                }
                Err(_) => {
                    warn!("detector panicked at t={}, publishing an empty frame", timestamp);
                    counters.detector_errors.fetch_add(1, Ordering::Relaxed);
                    FrameSnapshot::empty(timestamp)
                }
            };
            frame.timestamp = output_clock.next(frame.timestamp);

            match self.writer.publish(&frame) {
                Ok(()) => {
                    counters.frames_published.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("dropping frame t={}: {}", frame.timestamp, e);
                    counters.rejected_frames.fetch_add(1, Ordering::Relaxed);
                }
            }

            if let Some(interval) = interval {
                let elapsed = tick_started.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
        }
    }
}

/// Handle to the running producer thread
#[derive(Debug)]
pub struct ProducerWorker {
    running: Arc<AtomicBool>,
    counters: Arc<ProducerCounters>,
    handle: Option<JoinHandle<Box<dyn ProducerTask>>>,
}

impl ProducerWorker {
    /// Spawn the producer. `epoch` is the shared zero of the millisecond timeline.
    pub fn spawn<S, D>(
        source: S,
        detector: D,
        writer: FrameWriter,
        epoch: Instant,
        config: ProducerConfig,
    ) -> Result<Self>
    where
        S: FrameSource + 'static,
        D: Detector<Input = S::Item> + 'static,
    {
        Self::spawn_task(Self::task(source, detector, writer), epoch, &config)
    }

    /// Bundle a source, detector and writer into a task for [`spawn_task`](Self::spawn_task)
    pub fn task<S, D>(source: S, detector: D, writer: FrameWriter) -> Box<dyn ProducerTask>
    where
        S: FrameSource + 'static,
        D: Detector<Input = S::Item> + 'static,
    {
        Box::new(DetectorTask {
            source,
            detector,
            writer,
        })
    }

    /// Spawn a task handed back by [`stop_and_reclaim`](Self::stop_and_reclaim)
    pub fn spawn_task(mut task: Box<dyn ProducerTask>, epoch: Instant, config: &ProducerConfig) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(ProducerCounters::default());

        let thread_running = Arc::clone(&running);
        let thread_counters = Arc::clone(&counters);
        let interval = config.frame_interval;
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                task.run(epoch, interval, &thread_running, &thread_counters);
                thread_running.store(false, Ordering::Release);
                task
            })
            .map_err(|e| HandwaveError::from_io(e, "Failed to spawn producer thread"))?;

        info!("producer '{}' started", config.thread_name);
        Ok(Self {
            running,
            counters,
            handle: Some(handle),
        })
    }

    /// Still producing (not stopped and source not exhausted)
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ProducerStats {
        self.counters.snapshot()
    }

    /// Ask the thread to stop and wait for it
    pub fn stop(self) -> Result<ProducerStats> {
        self.stop_and_reclaim().map(|(stats, _)| stats)
    }

    /// Stop, returning the task so it can be spawned again
    pub fn stop_and_reclaim(mut self) -> Result<(ProducerStats, Box<dyn ProducerTask>)> {
        let task = self.shutdown()?;
        let task = task.ok_or_else(|| HandwaveError::pipeline("Producer already stopped"))?;
        Ok((self.stats(), task))
    }

    fn shutdown(&mut self) -> Result<Option<Box<dyn ProducerTask>>> {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map(Some)
                .map_err(|_| HandwaveError::pipeline("Producer thread panicked")),
            None => Ok(None),
        }
    }
}

impl Drop for ProducerWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, FrameChannel};

    struct FailingDetector {
        calls: usize,
    }

    impl Detector for FailingDetector {
        type Input = u32;

        fn detect(&mut self, input: &u32, timestamp_ms: f64) -> Result<FrameSnapshot> {
            self.calls += 1;
            if *input % 2 == 0 {
                Err(HandwaveError::detector("model not ready"))
            } else {
                Ok(FrameSnapshot::empty(timestamp_ms))
            }
        }
    }

    #[test]
    fn test_detector_errors_become_empty_frames() {
        let (writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        let worker = ProducerWorker::spawn(
            IterSource(0u32..6),
            FailingDetector { calls: 0 },
            writer,
            Instant::now(),
            ProducerConfig::default(),
        )
        .unwrap();

        while worker.is_running() {
            thread::yield_now();
        }
        let stats = worker.stop().unwrap();
        assert_eq!(stats.frames_published, 6);
        assert_eq!(stats.detector_errors, 3);
        assert!(reader.poll().unwrap().hands.is_empty());
    }

    #[test]
    fn test_passthrough_restamps_onto_producer_timeline() {
        let (writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        let frames = vec![FrameSnapshot::empty(1.0e9), FrameSnapshot::empty(1.0e9)];
        let worker = ProducerWorker::spawn(
            IterSource(frames.into_iter()),
            PassthroughDetector,
            writer,
            Instant::now(),
            ProducerConfig::default(),
        )
        .unwrap();
        while worker.is_running() {
            thread::yield_now();
        }
        worker.stop().unwrap();
        assert_eq!(reader.stats().frames_written, 2);
        let latest = reader.poll().unwrap();
        assert!(latest.timestamp >= 1.0 && latest.timestamp < 60_000.0);
    }

    #[test]
    fn test_reclaimed_task_resumes_its_source() {
        let (writer, mut reader) = FrameChannel::new(ChannelConfig::default()).unwrap().split();
        let epoch = Instant::now();
        let config = ProducerConfig::default().with_frame_interval(Duration::from_millis(1));
        let worker = ProducerWorker::spawn(
            IterSource(0u32..),
            FailingDetector { calls: 0 },
            writer,
            epoch,
            config.clone(),
        )
        .unwrap();
        while worker.stats().frames_published < 3 {
            thread::yield_now();
        }
        let (first, task) = worker.stop_and_reclaim().unwrap();
        let before = reader.poll().unwrap().timestamp;

        let worker = ProducerWorker::spawn_task(task, epoch, &config).unwrap();
        while worker.stats().frames_published < 3 {
            thread::yield_now();
        }
        let second = worker.stop().unwrap();
        assert!(first.frames_published >= 3);
        assert!(second.frames_published >= 3);
        assert!(reader.poll().unwrap().timestamp > before);
    }
}
