//! Publish/subscribe distribution of intent events

use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc, Arc, Mutex, PoisonError, RwLock,
};

use log::trace;
use serde::Serialize;

use super::event::{parse_event_type, IntentEvent};

/// Event callback
pub type EventHandler = Arc<dyn Fn(&IntentEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What a subscription listens to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// One exact type, `"<id>:start"`
    Exact(String),
    /// All three phases of one intent, `"<id>"`
    Intent(String),
    /// Everything, `"*"`
    All,
}

impl EventFilter {
    /// `"*"` is the wildcard, `"<id>:<phase>"` an exact type, anything else an intent id
    pub fn parse(topic: &str) -> Self {
        if topic == "*" {
            Self::All
        } else if parse_event_type(topic).is_some() {
            Self::Exact(topic.to_string())
        } else {
            Self::Intent(topic.to_string())
        }
    }

    pub fn accepts(&self, event: &IntentEvent) -> bool {
        match self {
            Self::Exact(event_type) => *event_type == event.event_type,
            Self::Intent(intent_id) => *intent_id == event.intent_id,
            Self::All => true,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    filter: EventFilter,
    handler: EventHandler,
}

/// Bus statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventBusStats {
    pub events_published: u64,
    pub deliveries: u64,
    pub subscribers: usize,
}

/// Typed pub/sub for intent events.
///
/// Handlers run on the publishing thread, outside the subscriber lock, so a handler may
/// subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    published: AtomicU64,
    deliveries: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("stats", &self.stats()).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe by topic string (see [`EventFilter::parse`])
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&IntentEvent) + Send + Sync + 'static,
    {
        self.subscribe_filter(EventFilter::parse(topic), handler)
    }

    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&IntentEvent) + Send + Sync + 'static,
    {
        self.subscribe_filter(EventFilter::All, handler)
    }

    pub fn subscribe_filter<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&IntentEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                filter,
                handler: Arc::new(handler),
            });
        id
    }

    /// Receive matching events on a channel instead of a callback
    pub fn subscribe_channel(&self, topic: &str) -> (SubscriptionId, mpsc::Receiver<IntentEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let id = self.subscribe(topic, move |event| {
            // A dropped receiver just stops listening
            let _ = tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .send(event.clone());
        });
        (id, rx)
    }

    /// Remove a subscription; `false` if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Deliver one event; returns the number of handlers invoked
    pub fn publish(&self, event: &IntentEvent) -> usize {
        let handlers: Vec<EventHandler> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.filter.accepts(event))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in &handlers {
            handler(event);
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(handlers.len() as u64, Ordering::Relaxed);
        trace!("{} -> {} handlers", event.event_type, handlers.len());
        handlers.len()
    }

    pub fn publish_all<'a, I: IntoIterator<Item = &'a IntentEvent>>(&self, events: I) -> usize {
        events.into_iter().map(|e| self.publish(e)).sum()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            events_published: self.published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}
