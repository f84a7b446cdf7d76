//! Persisted form of an adventure.

use std::collections::BTreeMap;

use crossroads_core::tree::{Edge, Node, StructuralId};
use serde::{Deserialize, Serialize};

use super::nodes::NodePayload;

/// One stored adventure: its id, whole tree, and the listener's criteria.
///
/// Every node payload must carry its `"kind"` tag (`"album"` or
/// `"direction"`). Documents whose nodes lack it, such as maps saved before
/// payloads were tagged, are not inferred from their fields and fail to load
/// as `AdventureError::Structural`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdventureDocument {
    /// Adventure id. Empty in documents written before ids were stored.
    #[serde(default)]
    pub id: String,
    /// Every node, keyed by id.
    pub nodes: BTreeMap<StructuralId, Node<NodePayload>>,
    /// Every edge, keyed by id.
    pub edges: BTreeMap<StructuralId, Edge>,
    /// Constraints every suggestion must meet.
    #[serde(default)]
    pub criteria: Vec<String>,
}
