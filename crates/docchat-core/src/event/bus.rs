//! Broadcast bus carrying `StoreEvent`s from the stores to any view.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no subscribers is a
//! no-op, so stores can publish unconditionally.

use docchat_types::event::{Notice, StoreEvent};
use tokio::sync::broadcast;

/// Default channel capacity. Streaming publishes one event per chunk.
pub const DEFAULT_CAPACITY: usize = 256;

/// Multi-consumer bus for store events.
///
/// Cloning the bus clones the sender; all clones feed the same subscribers.
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }

    /// Publish a user-facing notice.
    pub fn notify(&self, notice: Notice) {
        self.publish(StoreEvent::Notice(notice));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_types::event::NoticeLevel;

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(StoreEvent::SessionsChanged { count: 2 });

        assert_eq!(
            rx1.recv().await.unwrap(),
            StoreEvent::SessionsChanged { count: 2 }
        );
        assert_eq!(
            rx2.recv().await.unwrap(),
            StoreEvent::SessionsChanged { count: 2 }
        );
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(16);
        bus.publish(StoreEvent::MessagesChanged { count: 0 });
        bus.notify(Notice::info("nobody listening"));
    }

    #[test]
    fn notify_wraps_notice() {
        let bus = EventBus::new(16);
        let clone = bus.clone();
        let mut rx = bus.subscribe();

        clone.notify(Notice::error("Failed to load sessions"));

        match rx.try_recv().unwrap() {
            StoreEvent::Notice(notice) => {
                assert_eq!(notice.level, NoticeLevel::Error);
                assert_eq!(notice.text, "Failed to load sessions");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn debug_reports_receivers() {
        let bus = EventBus::default();
        let _rx = bus.subscribe();
        assert!(format!("{bus:?}").contains("receiver_count: 1"));
    }
}
