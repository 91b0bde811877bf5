//! Rolling history of recent frames
//!
//! The engine appends every frame it consumes; matching and lifecycle code only ever reads
//! through the pure queries here.

pub mod ring;
pub mod velocity;

pub use ring::{FrameHistory, DEFAULT_HISTORY_CAPACITY};
pub use velocity::{velocity_between, HandSelector};
