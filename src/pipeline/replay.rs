//! Deterministic replay of recorded frames through a real channel

use log::debug;

use crate::{
    channel::{ChannelConfig, FrameChannel},
    error::Result,
    events::IntentEvent,
    frame::FrameSnapshot,
    intent::Intent,
};

use super::{config::EngineConfig, engine::IntentEngine};

/// Push every frame through the channel and the engine on the calling thread.
///
/// Each frame is published and then polled, so none is dropped and the output depends only
/// on the frames and intents.
pub fn replay(
    frames: &[FrameSnapshot],
    intents: Vec<Intent>,
    engine_config: EngineConfig,
    channel_config: ChannelConfig,
) -> Result<Vec<IntentEvent>> {
    let (mut writer, mut reader) = FrameChannel::new(channel_config)?.split();
    let mut engine = IntentEngine::new(engine_config)?;
    engine.configure(intents)?;
    engine.start();

    let mut events = Vec::new();
    for frame in frames {
        writer.publish(frame)?;
        events.extend(engine.poll(&mut reader, frame.timestamp));
    }
    debug!("replayed {} frames into {} events", frames.len(), events.len());
    Ok(events)
}
