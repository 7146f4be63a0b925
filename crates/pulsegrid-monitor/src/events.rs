//! Event bus for monitor events.
//!
//! Thin typed wrapper over `tokio::sync::broadcast`. Emission is
//! fire-and-forget: it never blocks and never panics; with no
//! subscribers connected, events are silently dropped.

use tokio::sync::broadcast;
use tracing::debug;

use pulsegrid_core::MonitorEvent;

/// Distributes [`MonitorEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn emit(&self, event: MonitorEvent) {
        let kind = event.event_type();
        match self.sender.send(event) {
            Ok(n) => debug!(event = kind, subscribers = n, "event emitted"),
            Err(_) => {
                // No subscribers; nothing to deliver.
            }
        }
    }

    /// Subscribe to all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.emit(MonitorEvent::SyncStart {
            source: "notion".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(MonitorEvent::SyncStart {
            source: "gmail".to_string(),
        });
        bus.emit(MonitorEvent::SyncComplete {
            source: "gmail".to_string(),
        });

        assert_eq!(rx.recv().await.unwrap().event_type(), "sync-start");
        assert_eq!(rx.recv().await.unwrap().event_type(), "sync-complete");
    }
}
