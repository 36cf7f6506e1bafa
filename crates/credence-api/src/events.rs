//! # Lifecycle Event Bus
//!
//! Broadcast channel carrying [`LifecycleEvent`]s to external notifiers.
//! The dispatcher emits an event only after the corresponding store
//! write has committed — subscribers never see intermediate or rejected
//! transitions, and a slow subscriber can never block a transition
//! (lagging receivers drop oldest events).

use tokio::sync::broadcast;

use credence_state::LifecycleEvent;

/// Capacity of the broadcast channel before lagging receivers drop events.
const EVENT_BUS_CAPACITY: usize = 256;

/// Cloneable handle to the committed-transition event stream.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { tx }
    }

    /// Emit a committed transition. A send with no subscribers is fine.
    pub fn emit(&self, event: LifecycleEvent) {
        tracing::debug!(
            entity_kind = ?event.entity_kind,
            entity_id = %event.entity_id,
            new_state = %event.new_state,
            "lifecycle event"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credence_core::DocumentId;
    use credence_state::{DocumentStatus, EntityKind};

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(LifecycleEvent::document(DocumentId::new(), DocumentStatus::Pending));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.entity_kind, EntityKind::Document);
        assert_eq!(event.new_state, "pending");
    }

    #[test]
    fn emit_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.emit(LifecycleEvent::document(DocumentId::new(), DocumentStatus::Verified));
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.emit(LifecycleEvent::document(DocumentId::new(), DocumentStatus::Pending));

        let mut rx = bus.subscribe();
        bus.emit(LifecycleEvent::document(DocumentId::new(), DocumentStatus::Verified));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.new_state, "verified");
        assert!(rx.try_recv().is_err());
    }
}
