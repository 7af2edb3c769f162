//! Named-event subscriber registry
//!
//! Callbacks are invoked synchronously, in registration order, on the task
//! that calls [`EventBus::emit`]. A panic inside a callback propagates to the
//! emitter and the remaining callbacks for that emission are skipped; the
//! connection catches it at its dispatch boundary.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// Kind of payload carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A slice of request bytes
    Chunk,
}

/// Payload handed to every callback of an emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub kind: EventKind,
    pub data: Bytes,
}

impl EventData {
    pub fn chunk(data: impl Into<Bytes>) -> Self {
        Self {
            kind: EventKind::Chunk,
            data: data.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

pub type Callback = Box<dyn FnMut(&EventData) + Send>;

/// Handle returned by [`EventBus::on`] and [`EventBus::once`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    once: bool,
    callback: Callback,
}

#[derive(Default)]
pub struct EventBus {
    events: HashMap<String, Vec<Subscriber>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an event with no subscribers yet.
    pub fn register(&mut self, event: &str) {
        self.events.entry(event.to_string()).or_default();
    }

    /// Subscribes `callback` to every future emission of `event`.
    pub fn on<F>(&mut self, event: &str, callback: F) -> SubscriptionId
    where
        F: FnMut(&EventData) + Send + 'static,
    {
        self.subscribe(event, false, Box::new(callback))
    }

    /// Subscribes `callback` to the next emission of `event` only.
    pub fn once<F>(&mut self, event: &str, callback: F) -> SubscriptionId
    where
        F: FnMut(&EventData) + Send + 'static,
    {
        self.subscribe(event, true, Box::new(callback))
    }

    /// Removes a subscription. Returns false if it was not subscribed to `event`.
    pub fn off(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(subscribers) = self.events.get_mut(event) else {
            return false;
        };

        match subscribers.iter().position(|s| s.id == id) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invokes every subscriber of `event` in order.
    pub fn emit(&mut self, event: &str, data: &EventData) {
        let subscribers = self.events.entry(event.to_string()).or_default();

        let mut i = 0;
        while i < subscribers.len() {
            if subscribers[i].once {
                // Unsubscribed before the call so it cannot fire twice
                let mut subscriber = subscribers.remove(i);
                (subscriber.callback)(data);
                continue;
            }

            (subscribers[i].callback)(data);
            i += 1;
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.events.get(event).map_or(0, Vec::len)
    }

    pub fn is_registered(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    fn subscribe(&mut self, event: &str, once: bool, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        self.events
            .entry(event.to_string())
            .or_default()
            .push(Subscriber { id, once, callback });

        id
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, subscribers) in &self.events {
            map.entry(event, &subscribers.len());
        }
        map.finish()
    }
}
