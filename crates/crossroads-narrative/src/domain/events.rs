//! Domain events for the adventure context.

use crossroads_core::event::{DomainEvent, EventMetadata};
use crossroads_core::tree::StructuralId;
use serde::{Deserialize, Serialize};

/// Emitted when a generating operation starts or finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingChanged {
    /// `true` while an external call is in flight.
    pub loading: bool,
}

/// Emitted when children are committed under a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesAdded {
    /// The node that received children.
    pub parent_id: StructuralId,
    /// The new node ids, in insertion order.
    pub node_ids: Vec<StructuralId>,
}

/// Emitted when a subtree is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePruned {
    /// Root of the removed subtree.
    pub node_id: StructuralId,
    /// Every removed node id, root first.
    pub removed_ids: Vec<StructuralId>,
}

/// Emitted when the origin is replaced by a described starting album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingAlbumSet {
    /// Album title.
    pub name: String,
    /// Recording artist.
    pub creator: String,
}

/// Event payload variants for the adventure context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdventureEventKind {
    /// The loading signal flipped.
    LoadingChanged(LoadingChanged),
    /// Children were added.
    NodesAdded(NodesAdded),
    /// A subtree was removed.
    NodePruned(NodePruned),
    /// The starting album was set.
    StartingAlbumSet(StartingAlbumSet),
}

impl AdventureEventKind {
    /// Routing name of this kind of event.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::LoadingChanged(_) => "adventure.loading_changed",
            Self::NodesAdded(_) => "adventure.nodes_added",
            Self::NodePruned(_) => "adventure.node_pruned",
            Self::StartingAlbumSet(_) => "adventure.starting_album_set",
        }
    }
}

/// Domain event envelope for the adventure context.
#[derive(Debug, Clone, PartialEq)]
pub struct AdventureEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: AdventureEventKind,
}

impl DomainEvent for AdventureEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or_default()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_nodes_added_payload_uses_decimal_string_ids() {
        // Arrange
        let event = AdventureEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: "adventure.nodes_added".to_owned(),
                adventure_id: "1768471200000".to_owned(),
                correlation_id: Uuid::new_v4(),
                occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            },
            kind: AdventureEventKind::NodesAdded(NodesAdded {
                parent_id: StructuralId::new(0),
                node_ids: vec![StructuralId::new(2), StructuralId::new(4)],
            }),
        };

        // Act
        let payload = event.to_payload();

        // Assert
        assert_eq!(event.event_type(), "adventure.nodes_added");
        assert_eq!(
            payload,
            serde_json::json!({ "NodesAdded": { "parent_id": "0", "node_ids": ["2", "4"] } })
        );
    }
}
