//! Domain event abstractions and publishing.
//!
//! Aggregates record events while they mutate; command handlers drain those
//! events and hand them to an [`EventPublisher`]. Observers (a UI, a log
//! sink, a test) subscribe to the publisher instead of registering
//! callbacks on the aggregate.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for routing, e.g. `"adventure.nodes_added"`.
    pub event_type: String,
    /// Adventure this event belongs to.
    pub adventure_id: String,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + Debug {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}

/// Sink for domain events produced by command handlers.
pub trait EventPublisher<E>: Send + Sync {
    /// Delivers one event to every current observer.
    fn publish(&self, event: &E);
}

/// Publisher backed by a `tokio` broadcast channel.
///
/// Publishing never blocks. Events sent while nobody is subscribed are
/// dropped, and a subscriber that falls more than `capacity` events behind
/// observes a `Lagged` error on its next receive.
#[derive(Debug)]
pub struct BroadcastPublisher<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> BroadcastPublisher<E> {
    /// Creates a publisher buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new observer. It receives events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

impl<E: Clone + Send + Debug> EventPublisher<E> for BroadcastPublisher<E> {
    fn publish(&self, event: &E) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(?event, "event published with no subscribers");
        }
    }
}

/// Publisher that drops every event. For callers with no observers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardingPublisher;

impl<E> EventPublisher<E> for DiscardingPublisher {
    fn publish(&self, _event: &E) {}
}
