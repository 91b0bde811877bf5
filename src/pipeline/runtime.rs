//! Producer thread + consumer engine wired through one frame channel

use std::{fmt, sync::Arc, time::Instant};

use log::debug;

use crate::{
    channel::{ChannelConfig, ChannelStatsSnapshot, FrameChannel, FrameReader},
    error::{HandwaveError, Result},
    events::{EventBus, IntentEvent},
    frame::FrameSnapshot,
    intent::{ActiveAction, Intent},
};

use super::{
    config::EngineConfig,
    engine::{EngineState, IntentEngine},
    producer::{Detector, FrameSource, ProducerConfig, ProducerStats, ProducerTask, ProducerWorker},
};

/// A recognition pipeline: one producer thread and the consumer engine.
///
/// The caller drives the consumer side by calling [`tick`](Self::tick) at its own cadence
/// (typically once per rendered frame); the producer runs on its own thread. A stopped
/// pipeline keeps its source and detector and can be started again.
pub struct Pipeline {
    engine: IntentEngine,
    reader: FrameReader,
    producer: Option<ProducerWorker>,
    idle_task: Option<Box<dyn ProducerTask>>,
    producer_config: ProducerConfig,
    last_stats: Option<ProducerStats>,
    epoch: Instant,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("engine", &self.engine)
            .field("producer", &self.producer)
            .field("producer_config", &self.producer_config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Allocate the channel and register `intents`, without starting anything.
    ///
    /// Fails immediately if the channel memory cannot be mapped.
    pub fn new<S, D>(
        channel: ChannelConfig,
        engine: EngineConfig,
        producer: ProducerConfig,
        intents: Vec<Intent>,
        source: S,
        detector: D,
    ) -> Result<Self>
    where
        S: FrameSource + 'static,
        D: Detector<Input = S::Item> + 'static,
    {
        let (writer, reader) = FrameChannel::new(channel)?.split();
        let mut engine = IntentEngine::new(engine)?;
        engine.configure(intents)?;

        Ok(Self {
            engine,
            reader,
            producer: None,
            idle_task: Some(ProducerWorker::task(source, detector, writer)),
            producer_config: producer,
            last_stats: None,
            epoch: Instant::now(),
        })
    }

    /// Create and start a pipeline with an uncapped producer
    pub fn spawn<S, D>(
        channel: ChannelConfig,
        engine: EngineConfig,
        intents: Vec<Intent>,
        source: S,
        detector: D,
    ) -> Result<Self>
    where
        S: FrameSource + 'static,
        D: Detector<Input = S::Item> + 'static,
    {
        Self::spawn_with(channel, engine, ProducerConfig::default(), intents, source, detector)
    }

    /// Like [`spawn`](Self::spawn), with explicit producer settings
    pub fn spawn_with<S, D>(
        channel: ChannelConfig,
        engine: EngineConfig,
        producer: ProducerConfig,
        intents: Vec<Intent>,
        source: S,
        detector: D,
    ) -> Result<Self>
    where
        S: FrameSource + 'static,
        D: Detector<Input = S::Item> + 'static,
    {
        let mut pipeline = Self::new(channel, engine, producer, intents, source, detector)?;
        pipeline.start()?;
        Ok(pipeline)
    }

    /// Start the engine and the producer thread. Starting a running pipeline does nothing.
    ///
    /// A frame left in the channel by a previous run is skipped.
    pub fn start(&mut self) -> Result<()> {
        if self.producer.is_some() {
            return Ok(());
        }
        let task = self
            .idle_task
            .take()
            .ok_or_else(|| HandwaveError::pipeline("Producer task was lost; pipeline cannot restart"))?;
        if self.reader.poll().is_some() {
            debug!("skipped a frame left over from the previous run");
        }
        self.producer = Some(ProducerWorker::spawn_task(task, self.epoch, &self.producer_config)?);
        self.engine.start();
        Ok(())
    }

    /// Milliseconds since the pipeline started, on the producer's timeline
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// One consumer tick
    pub fn tick(&mut self) -> Vec<IntentEvent> {
        let now = self.now_ms();
        self.engine.poll(&mut self.reader, now)
    }

    pub fn configure(&mut self, intents: Vec<Intent>) -> Result<()> {
        self.engine.configure(intents)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.engine.pause()
    }

    pub fn resume(&mut self) -> Result<()> {
        self.engine.resume()
    }

    /// Stop the producer and the engine; live actions are discarded without events.
    ///
    /// Returns the stats of the run just stopped, `None` if it was not running.
    pub fn stop(&mut self) -> Result<Option<ProducerStats>> {
        self.engine.stop();
        let Some(worker) = self.producer.take() else {
            return Ok(None);
        };
        let (stats, task) = worker.stop_and_reclaim()?;
        self.idle_task = Some(task);
        self.last_stats = Some(stats);
        Ok(Some(stats))
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn is_producing(&self) -> bool {
        self.producer.as_ref().map_or(false, ProducerWorker::is_running)
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(self.engine.events())
    }

    pub fn engine(&self) -> &IntentEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut IntentEngine {
        &mut self.engine
    }

    pub fn frame_history(&self) -> Vec<Arc<FrameSnapshot>> {
        self.engine.frame_history()
    }

    pub fn active_actions(&self) -> Vec<ActiveAction> {
        self.engine.active_actions()
    }

    pub fn channel_stats(&self) -> ChannelStatsSnapshot {
        self.reader.stats()
    }

    /// Stats of the current run, or of the last one once stopped
    pub fn producer_stats(&self) -> Option<ProducerStats> {
        self.producer.as_ref().map(ProducerWorker::stats).or(self.last_stats)
    }
}
