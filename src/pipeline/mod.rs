//! Producer/consumer pipeline and its control surface
//!
//! - [`producer`]: detector thread writing frames into the channel
//! - [`engine`]: per-tick matching, conflict resolution, lifecycle and publishing
//! - [`runtime`]: both halves wired together behind start/stop/pause/resume
//! - [`replay`]: single-threaded, deterministic run over recorded frames

pub mod clock;
pub mod config;
pub mod engine;
pub mod producer;
pub mod replay;
pub mod runtime;

pub use clock::MonotonicClock;
pub use config::{EngineConfig, DEFAULT_TRACKING_TIMEOUT_MS};
pub use engine::{EngineState, EngineStats, IntentEngine};
pub use producer::{
    Detector, FrameSource, IterSource, PassthroughDetector, ProducerConfig, ProducerStats,
    ProducerTask, ProducerWorker,
};
pub use replay::replay;
pub use runtime::Pipeline;
