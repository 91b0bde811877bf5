//! Shared frame channel between the detector thread and the interaction thread
//!
//! ```text
//! producer (detector)                         consumer (engine tick)
//!   FrameWriter::write ──► inactive slot        FrameReader::poll
//!   FrameWriter::swap  ──► activeIndex ◄─────── load once per attempt
//! ```
//!
//! Single writer, single reader, no locks, no queue. A fast producer overwrites frames the
//! consumer has not read yet.

pub mod codec;
pub mod config;
pub mod double_buffer;
pub mod layout;
pub mod stats;

pub use codec::{decode_slot, encode_slot};
pub use config::ChannelConfig;
pub use double_buffer::{FrameChannel, FrameReader, FrameWriter};
pub use layout::ChannelLayout;
pub use stats::{ChannelStats, ChannelStatsSnapshot};
