//! # Change Notifications
//!
//! A process-wide broadcast bus. The manager publishes one payload-free
//! [`ListEvent::Updated`] after each successful mutation; subscribers
//! re-fetch whatever they display.
//!
//! ```text
//! ShoppingListManager ──publish(Updated)──► broadcast::Sender
//!                                              ├──► WebSocket connection A
//!                                              ├──► WebSocket connection B
//!                                              └──► (none: send fails, ignored)
//! ```

use tokio::sync::broadcast;
use tracing::trace;

/// Wire name of the list-updated event.
pub const EVENT_SHOPPING_LIST_UPDATED: &str = "shopping_list_manager_updated";

/// Default channel capacity. Slow subscribers beyond this see `Lagged`.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Events published by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    /// The catalog or the active list changed.
    Updated,
}

impl ListEvent {
    /// Returns the event's wire name.
    pub fn event_type(&self) -> &'static str {
        match self {
            ListEvent::Updated => EVENT_SHOPPING_LIST_UPDATED,
        }
    }
}

/// Cloneable handle to the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ListEvent>,
}

impl EventBus {
    /// Creates a bus with room for `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Never fails: with no subscribers the event is dropped.
    pub fn publish(&self, event: ListEvent) {
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(event = event.event_type(), delivered, "Published event");
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
