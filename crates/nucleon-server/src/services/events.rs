// ============================================
// File: crates/nucleon-server/src/services/events.rs
// ============================================
//! # Internal Event Bus
//!
//! Fire-and-forget broadcast of named events to interested subsystems.
//! Publishing never blocks and never fails; events published with no
//! subscribers are dropped.

use tokio::sync::broadcast;

/// Name of the event broadcast once registration with Nucleus succeeds.
/// The payload is the externally reachable base URL.
pub const NUCLEUS_CONNECTED_EVENT: &str = "nucleusConnected";

/// An internal event with a string payload.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// Event payload.
    pub payload: String,
}

/// Broadcast event bus.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates an event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to all events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publishes an event. Fire-and-forget: dropped if nobody listens.
    pub fn publish(&self, name: &str, payload: &str) {
        let _ = self.tx.send(Event {
            name: name.to_string(),
            payload: payload.to_string(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(NUCLEUS_CONNECTED_EVENT, "https://example.test/");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, NUCLEUS_CONNECTED_EVENT);
        assert_eq!(event.payload, "https://example.test/");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        // Must not panic or block.
        bus.publish("orphan", "payload");
    }
}
