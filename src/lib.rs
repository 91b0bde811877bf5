//! # Handwave - Hand-Gesture Intent Recognition
//!
//! Handwave turns per-frame hand and face detections into semantic intent events
//! (`start`, `update`, `end`) that an application can react to.
//!
//! ## Features
//!
//! - **Zero-copy frame channel**: Double-buffered shared memory slot pair with seqlock reads
//! - **Frame history**: Bounded ring of recent snapshots with duration and velocity queries
//! - **Pattern trees**: Gesture and pinch leaves combined with `anyOf`/`allOf`/`sequence`
//! - **Action lifecycle**: Minimum durations, gap tolerance and deterministic action ids
//! - **Conflict resolution**: Per-group winner-takes-all, top-k or custom ranking
//! - **Event bus**: Exact, per-intent and wildcard subscriptions
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   FrameChannel    ┌──────────────────────────────────┐
//! │  Producer thread     │ ────────────────▶ │  IntentEngine (consumer tick)     │
//! │  - FrameSource       │   two slots,      │  - FrameHistory                   │
//! │  - Detector          │   active index    │  - pattern matcher                │
//! └──────────────────────┘                   │  - ConflictResolver               │
//!                                            │  - ActionTracker                  │
//!                                            └────────────────┬─────────────────┘
//!                                                             ▼
//!                                                        EventBus
//! ```
//!
//! ## Example
//!
//! ```
//! use handwave::{pattern::gesture, FrameSnapshot, Gesture, Intent, IntentEngine, EngineConfig};
//!
//! let mut engine = IntentEngine::new(EngineConfig::default()).unwrap();
//! engine
//!     .configure(vec![Intent::new("grab", gesture(Gesture::ClosedFist))])
//!     .unwrap();
//! engine.start();
//!
//! let events = engine.process_frame(FrameSnapshot::empty(0.0));
//! assert!(events.is_empty());
//! ```

// Core modules
pub mod error;
pub mod frame;
pub mod memory;
pub mod sync;

// Transport
pub mod channel;

// Recognition
pub mod history;
pub mod intent;
pub mod pattern;

// Delivery and control
pub mod events;
pub mod pipeline;
pub mod recording;

// Main API re-exports
pub use channel::{ChannelConfig, ChannelLayout, ChannelStatsSnapshot, FrameChannel, FrameReader, FrameWriter};
pub use error::{HandwaveError, Result};
pub use events::{EventBus, EventFilter, EventPhase, IntentEvent, SubscriptionId};
pub use frame::{
    FrameSnapshot, Gesture, Handedness, Landmark, RawFaceDetection, RawHandDetection, Vec3,
    WorldLandmark,
};
pub use history::FrameHistory;
pub use intent::{
    ActionContext, ActionState, ActiveAction, ConflictResolver, EndReason, GridConfig, Intent,
    IntentSet, ResolutionStrategy,
};
pub use memory::{BackingType, RegionConfig, SharedMemoryRegion};
pub use pattern::{Pattern, PatternDef};
pub use pipeline::{
    replay, Detector, EngineConfig, EngineState, FrameSource, IntentEngine, Pipeline,
    ProducerWorker,
};
pub use recording::{FrameRecording, RecordingSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 3;
pub const VERSION_PATCH: u32 = 0;
