//! Event broadcaster for administrative counter events.
//!
//! Uses tokio's broadcast channel so that any number of audit consumers can
//! follow counter changes without coupling to the storage backend.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::CounterEvent;

/// Default buffer size for the broadcast channel.
/// Events beyond this limit will cause older events to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Broadcaster for counter events.
///
/// Cheap to clone; every clone sends into the same channel.
///
/// # Example
///
/// ```
/// use medseq_core::SequenceName;
/// use medseq_core::events::{CounterEvent, EventBroadcaster};
///
/// let broadcaster = EventBroadcaster::new();
/// let mut receiver = broadcaster.subscribe();
///
/// let name = SequenceName::new("opdNumber").unwrap();
/// broadcaster.send(CounterEvent::reset(name, 0));
///
/// // let event = receiver.recv().await.unwrap();
/// ```
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<CounterEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns 0 if there are no active subscribers.
    pub fn send(&self, event: CounterEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Subscribe to events.
    ///
    /// Events sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CounterEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceName;
    use crate::events::CounterEventType;

    fn opd() -> SequenceName {
        SequenceName::new("opdNumber").unwrap()
    }

    #[test]
    fn test_broadcaster_creation() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(!broadcaster.has_subscribers());
    }

    #[test]
    fn test_broadcaster_no_subscribers() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.send(CounterEvent::reset(opd(), 0)), 0);
    }

    #[tokio::test]
    async fn test_broadcaster_send_receive() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        broadcaster.send(CounterEvent::reserved(opd(), 50));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type, CounterEventType::Reserved);
        assert_eq!(event.sequence, opd());
        assert_eq!(event.value, 50);
    }

    #[tokio::test]
    async fn test_broadcaster_multiple_subscribers() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver1 = broadcaster.subscribe();
        let mut receiver2 = broadcaster.subscribe();

        let count = broadcaster.send(CounterEvent::advanced(opd(), 51));
        assert_eq!(count, 2);

        assert_eq!(receiver1.recv().await.unwrap().value, 51);
        assert_eq!(receiver2.recv().await.unwrap().value, 51);
    }

    #[test]
    fn test_broadcaster_shared() {
        let broadcaster = EventBroadcaster::new_shared();
        let broadcaster2 = broadcaster.clone();

        let _receiver = broadcaster.subscribe();
        assert_eq!(broadcaster2.subscriber_count(), 1);
    }
}
