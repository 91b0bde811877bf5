//! Intent events and the bus that distributes them
//!
//! This is the only surface rendering/UI code should consume.

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventBusStats, EventFilter, EventHandler, SubscriptionId};
pub use event::{event_type, parse_event_type, EventPhase, IntentEvent};
