//! Broadcast event bus.
//!
//! Uses `tokio::sync::broadcast`: every subscriber sees every event emitted
//! after it subscribed. A subscriber that falls behind by more than the buffer
//! capacity skips the oldest events (reported as `RecvError::Lagged`).

use tokio::sync::broadcast;
use tracing::trace;

use super::events::ClientEvent;

/// The bus connecting the WhatsApp client to its consumers.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Create a new bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it; zero subscribers is fine.
    pub fn emit(&self, event: ClientEvent) -> usize {
        trace!(event = event.name(), "emit");
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
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
    use crate::types::WebMessage;

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.emit(ClientEvent::Open), 0);
    }

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.emit(ClientEvent::Open), 2);

        assert_eq!(a.recv().await.unwrap(), ClientEvent::Open);
        assert_eq!(b.recv().await.unwrap(), ClientEvent::Open);
    }

    #[tokio::test]
    async fn test_event_ordering() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(ClientEvent::Connecting);
        bus.emit(ClientEvent::Open);
        bus.emit(ClientEvent::NewMessage(WebMessage::default()));

        assert_eq!(rx.recv().await.unwrap().name(), "connecting");
        assert_eq!(rx.recv().await.unwrap().name(), "open");
        assert_eq!(rx.recv().await.unwrap().name(), "new-message");
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(8);
        bus.emit(ClientEvent::Open);
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.subscriber_count(), 1);
    }
}
