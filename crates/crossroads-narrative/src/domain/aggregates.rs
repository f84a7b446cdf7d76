//! Aggregate root for the adventure context.

use std::collections::HashSet;

use crossroads_core::clock::Clock;
use crossroads_core::error::AdventureError;
use crossroads_core::event::EventMetadata;
use crossroads_core::generation::ChatMessage;
use crossroads_core::tree::{SerializedTree, StructuralId};
use uuid::Uuid;

use super::document::AdventureDocument;
use super::events::{
    AdventureEvent, AdventureEventKind, LoadingChanged, NodePruned, NodesAdded, StartingAlbumSet,
};
use super::nodes::{AdventureTree, Album, NodeKind, NodePayload, selection_index_for};
use super::replay::{replay, replay_with_request};

/// The aggregate root for one music adventure.
///
/// Owns the tree and the listener's criteria, and keeps the tree's kinds
/// alternating: albums at even depth, directions at odd depth.
#[derive(Debug)]
pub struct Adventure {
    /// Adventure identifier.
    pub id: String,
    criteria: Vec<String>,
    tree: AdventureTree,
    loading: bool,
    /// Uncommitted events pending publication.
    uncommitted_events: Vec<AdventureEvent>,
}

impl Adventure {
    /// Creates an adventure whose origin is `starting_album`.
    #[must_use]
    pub fn new(id: impl Into<String>, starting_album: Album, criteria: Vec<String>) -> Self {
        let origin = Album {
            selection_index: "0".to_owned(),
            ..starting_album
        };
        Self {
            id: id.into(),
            criteria,
            tree: AdventureTree::new(NodePayload::Album(origin)),
            loading: false,
            uncommitted_events: Vec::new(),
        }
    }

    /// Creates an adventure whose id is the clock's current millisecond
    /// timestamp.
    #[must_use]
    pub fn create(clock: &dyn Clock, starting_album: Album, criteria: Vec<String>) -> Self {
        Self::new(clock.adventure_id(), starting_album, criteria)
    }

    /// Rebuilds an adventure from its stored document.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` if the document does not hold a
    /// single tree rooted at an album with alternating kinds.
    pub fn from_document(document: AdventureDocument) -> Result<Self, AdventureError> {
        let AdventureDocument {
            id,
            nodes,
            edges,
            criteria,
        } = document;
        let tree = AdventureTree::from_serialized(SerializedTree { nodes, edges })?;

        let origin = tree.origin();
        if !origin.data.is_album() {
            return Err(AdventureError::Structural(format!(
                "origin node {} is a {}, not an album",
                origin.id,
                origin.data.kind()
            )));
        }
        for edge in tree.edges() {
            let parent = tree.node(edge.source)?.data.kind();
            let child = tree.node(edge.target)?.data.kind();
            if child != parent.child_kind() {
                return Err(AdventureError::Structural(format!(
                    "{child} node {} sits under {parent} node {}",
                    edge.target, edge.source
                )));
            }
        }

        Ok(Self {
            id,
            criteria,
            tree,
            loading: false,
            uncommitted_events: Vec::new(),
        })
    }

    /// Copies the adventure out into its stored form.
    #[must_use]
    pub fn to_document(&self) -> AdventureDocument {
        let SerializedTree { nodes, edges } = self.tree.to_serialized();
        AdventureDocument {
            id: self.id.clone(),
            nodes,
            edges,
            criteria: self.criteria.clone(),
        }
    }

    /// Returns the listener's criteria.
    #[must_use]
    pub fn criteria(&self) -> &[String] {
        &self.criteria
    }

    /// Returns the tree.
    #[must_use]
    pub fn tree(&self) -> &AdventureTree {
        &self.tree
    }

    /// Returns `true` while a generating operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the origin album.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` if the origin is not an album.
    pub fn starting_album(&self) -> Result<&Album, AdventureError> {
        let origin = self.tree.origin();
        origin.data.as_album().ok_or_else(|| {
            AdventureError::Structural(format!("origin node {} is not an album", origin.id))
        })
    }

    /// Number of album nodes, the origin included.
    #[must_use]
    pub fn album_count(&self) -> usize {
        self.tree.nodes().filter(|node| node.data.is_album()).count()
    }

    /// Number of direction nodes.
    #[must_use]
    pub fn direction_count(&self) -> usize {
        self.tree.node_count() - self.album_count()
    }

    /// Finds the child of `parent_id` carrying `selection_index`.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `parent_id` is absent, or
    /// `AdventureError::SelectionNotFound` if no child matches.
    pub fn find_child(
        &self,
        parent_id: StructuralId,
        selection_index: &str,
    ) -> Result<StructuralId, AdventureError> {
        self.tree
            .children(parent_id)?
            .into_iter()
            .find(|child| child.data.selection_index() == selection_index)
            .map(|child| child.id)
            .ok_or_else(|| AdventureError::SelectionNotFound {
                parent: parent_id,
                selection_index: selection_index.to_owned(),
            })
    }

    /// Returns the first selection index in `a, b, ..., z, aa, ...` that no
    /// child of `parent_id` uses yet.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `parent_id` is absent.
    pub fn next_selection_index(&self, parent_id: StructuralId) -> Result<String, AdventureError> {
        let children = self.tree.children(parent_id)?;
        let taken: HashSet<&str> = children
            .iter()
            .map(|child| child.data.selection_index())
            .collect();
        Ok((0..)
            .map(selection_index_for)
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_default())
    }

    /// Rejects payloads whose selection index a sibling already carries, or
    /// that repeat one another.
    fn ensure_unused_indices(
        &self,
        parent_id: StructuralId,
        payloads: &[NodePayload],
    ) -> Result<(), AdventureError> {
        let children = self.tree.children(parent_id)?;
        let mut taken: HashSet<&str> = children
            .iter()
            .map(|child| child.data.selection_index())
            .collect();
        for payload in payloads {
            if !taken.insert(payload.selection_index()) {
                return Err(AdventureError::Structural(format!(
                    "node {parent_id} already has a child with selection index {:?}",
                    payload.selection_index()
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds the generation transcript for `target`.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `target` is absent, or
    /// `AdventureError::Structural` if the tree is malformed.
    pub fn transcript_at(&self, target: StructuralId) -> Result<Vec<ChatMessage>, AdventureError> {
        replay(&self.tree, &self.criteria, target)
    }

    /// Rebuilds the transcript for `target` followed by one listener
    /// request.
    ///
    /// # Errors
    ///
    /// Same as [`transcript_at`](Self::transcript_at).
    pub fn transcript_with_request(
        &self,
        target: StructuralId,
        request: &str,
    ) -> Result<Vec<ChatMessage>, AdventureError> {
        replay_with_request(&self.tree, &self.criteria, target, request)
    }

    /// Commits `payloads` as children of `parent_id`, in order, producing a
    /// `NodesAdded` event.
    ///
    /// Either every payload is inserted or none is.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `parent_id` is absent, or
    /// `AdventureError::Structural` if a payload has the same kind as the
    /// parent or reuses a sibling's selection index.
    pub fn add_children(
        &mut self,
        parent_id: StructuralId,
        payloads: Vec<NodePayload>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Vec<StructuralId>, AdventureError> {
        let expected = self.tree.node(parent_id)?.data.kind().child_kind();
        if let Some(wrong) = payloads.iter().find(|payload| payload.kind() != expected) {
            return Err(misplaced(wrong.kind(), parent_id, expected.child_kind()));
        }
        self.ensure_unused_indices(parent_id, &payloads)?;
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let node_ids = self.tree.add_children(parent_id, payloads)?;
        self.record(
            AdventureEventKind::NodesAdded(NodesAdded {
                parent_id,
                node_ids: node_ids.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(node_ids)
    }

    /// Commits one child. See [`add_children`](Self::add_children).
    ///
    /// # Errors
    ///
    /// Same as [`add_children`](Self::add_children).
    pub fn add_child(
        &mut self,
        parent_id: StructuralId,
        payload: NodePayload,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<StructuralId, AdventureError> {
        let expected = self.tree.node(parent_id)?.data.kind().child_kind();
        if payload.kind() != expected {
            return Err(misplaced(payload.kind(), parent_id, expected.child_kind()));
        }
        self.ensure_unused_indices(parent_id, std::slice::from_ref(&payload))?;
        let node_id = self.tree.add_child(parent_id, payload)?;
        self.record(
            AdventureEventKind::NodesAdded(NodesAdded {
                parent_id,
                node_ids: vec![node_id],
            }),
            correlation_id,
            clock,
        );
        Ok(node_id)
    }

    /// Removes `node_id` and its descendants, producing a `NodePruned`
    /// event.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` for the origin, or
    /// `AdventureError::NodeNotFound` if `node_id` is absent.
    pub fn prune(
        &mut self,
        node_id: StructuralId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Vec<StructuralId>, AdventureError> {
        let removed_ids = self.tree.prune(node_id)?;
        self.record(
            AdventureEventKind::NodePruned(NodePruned {
                node_id,
                removed_ids: removed_ids.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(removed_ids)
    }

    /// Replaces the origin album, producing a `StartingAlbumSet` event.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` once the origin has children,
    /// since their recorded summaries describe the old album.
    pub fn set_starting_album(
        &mut self,
        album: Album,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), AdventureError> {
        let origin_id = self.tree.origin_id();
        if self.tree.has_children(origin_id)? {
            return Err(AdventureError::Structural(
                "the starting album cannot change once the adventure has branched".into(),
            ));
        }
        let album = Album {
            selection_index: "0".to_owned(),
            ..album
        };
        let kind = AdventureEventKind::StartingAlbumSet(StartingAlbumSet {
            name: album.name.clone(),
            creator: album.creator.clone(),
        });
        self.tree.replace_data(origin_id, NodePayload::Album(album))?;
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Flips the loading signal, producing a `LoadingChanged` event.
    pub fn set_loading(&mut self, loading: bool, correlation_id: Uuid, clock: &dyn Clock) {
        self.loading = loading;
        self.record(
            AdventureEventKind::LoadingChanged(LoadingChanged { loading }),
            correlation_id,
            clock,
        );
    }

    /// Returns events recorded since the last drain.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[AdventureEvent] {
        &self.uncommitted_events
    }

    /// Drains the recorded events, oldest first.
    pub fn take_uncommitted_events(&mut self) -> Vec<AdventureEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn record(&mut self, kind: AdventureEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.uncommitted_events.push(AdventureEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                adventure_id: self.id.clone(),
                correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        });
    }
}

fn misplaced(child: NodeKind, parent_id: StructuralId, parent: NodeKind) -> AdventureError {
    AdventureError::Structural(format!(
        "a {child} node cannot be added under {parent} node {parent_id}"
    ))
}
