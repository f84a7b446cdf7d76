//! Generic rooted tree with a shared, never-reused id space.
//!
//! Nodes and edges draw their ids from one [`IdAllocator`] owned by the
//! tree. Ids are issued in increasing order and never recycled, so an id
//! that was pruned keeps failing lookups instead of silently pointing at a
//! newer node. Adding a child allocates the edge id first, then the node id.
//!
//! The tree knows nothing about what its payloads mean; domain rules such
//! as alternating node kinds live with the callers.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AdventureError;

/// Identifier shared by nodes and edges. Serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructuralId(u64);

impl StructuralId {
    /// Wraps a raw id value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StructuralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StructuralId {
    type Err = AdventureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| AdventureError::Validation(format!("invalid structural id {s:?}")))
    }
}

impl Serialize for StructuralId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StructuralId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = StructuralId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal structural id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<u64>()
                    .map(StructuralId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(StructuralId(v))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Issues structural ids for one tree instance.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Creates an allocator whose first id is `next`.
    #[must_use]
    pub const fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Issues the next id.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` once the id space is exhausted.
    pub fn allocate(&mut self) -> Result<StructuralId, AdventureError> {
        let following = self.next.checked_add(1).ok_or_else(exhausted)?;
        let id = StructuralId(self.next);
        self.next = following;
        Ok(id)
    }

    /// Checks that `count` more ids can be issued.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` if fewer than `count` ids remain.
    pub fn ensure_available(&self, count: usize) -> Result<(), AdventureError> {
        u64::try_from(count)
            .ok()
            .and_then(|count| self.next.checked_add(count))
            .map(|_| ())
            .ok_or_else(exhausted)
    }

    /// Returns the id the next call to [`allocate`](Self::allocate) issues.
    #[must_use]
    pub const fn peek(&self) -> StructuralId {
        StructuralId(self.next)
    }
}

fn exhausted() -> AdventureError {
    AdventureError::Structural("id space exhausted".into())
}

/// A tree node and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<T> {
    /// Node id.
    pub id: StructuralId,
    /// Caller-defined payload.
    pub data: T,
}

/// A directed parent→child link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id, from the same id space as nodes.
    pub id: StructuralId,
    /// Parent node id.
    pub source: StructuralId,
    /// Child node id.
    pub target: StructuralId,
}

/// Plain node and edge maps, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedTree<T> {
    /// Nodes keyed by id.
    pub nodes: BTreeMap<StructuralId, Node<T>>,
    /// Edges keyed by id.
    pub edges: BTreeMap<StructuralId, Edge>,
}

/// A rooted tree of `T` payloads.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    origin_id: StructuralId,
    nodes: BTreeMap<StructuralId, Node<T>>,
    // Keyed by id, so iteration order is insertion order.
    edges: BTreeMap<StructuralId, Edge>,
    ids: IdAllocator,
}

impl<T> Tree<T> {
    /// Creates a tree holding only the origin node, which receives the first
    /// id (`0`).
    #[must_use]
    pub fn new(origin_data: T) -> Self {
        let origin_id = StructuralId(0);
        let ids = IdAllocator::starting_at(1);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            origin_id,
            Node {
                id: origin_id,
                data: origin_data,
            },
        );
        Self {
            origin_id,
            nodes,
            edges: BTreeMap::new(),
            ids,
        }
    }

    /// Rebuilds a tree from stored maps.
    ///
    /// The origin is the unique node with no incoming edge. The id counter
    /// resumes one past the largest node or edge id present.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` if the maps do not describe a
    /// single rooted tree: no nodes, a key that differs from its record's
    /// id, an id used by both a node and an edge, an edge to or from a
    /// missing node, a node with two parents, zero or several roots, or
    /// nodes unreachable from the root.
    pub fn from_serialized(serialized: SerializedTree<T>) -> Result<Self, AdventureError> {
        let SerializedTree { nodes, edges } = serialized;
        if nodes.is_empty() {
            return Err(AdventureError::Structural("tree has no nodes".into()));
        }
        for (key, node) in &nodes {
            if *key != node.id {
                return Err(AdventureError::Structural(format!(
                    "node stored under {key} claims id {}",
                    node.id
                )));
            }
        }

        let mut targets = HashSet::with_capacity(edges.len());
        for (key, edge) in &edges {
            if *key != edge.id {
                return Err(AdventureError::Structural(format!(
                    "edge stored under {key} claims id {}",
                    edge.id
                )));
            }
            if nodes.contains_key(key) {
                return Err(AdventureError::Structural(format!(
                    "id {key} is used by both a node and an edge"
                )));
            }
            for end in [edge.source, edge.target] {
                if !nodes.contains_key(&end) {
                    return Err(AdventureError::Structural(format!(
                        "edge {key} references missing node {end}"
                    )));
                }
            }
            if !targets.insert(edge.target) {
                return Err(AdventureError::Structural(format!(
                    "node {} has more than one parent",
                    edge.target
                )));
            }
        }

        let mut roots = nodes.keys().filter(|id| !targets.contains(*id));
        let origin_id = match (roots.next(), roots.next()) {
            (Some(root), None) => *root,
            (None, _) => return Err(AdventureError::Structural("tree has no root".into())),
            (Some(_), Some(_)) => {
                return Err(AdventureError::Structural("tree has several roots".into()));
            }
        };

        let next = nodes
            .keys()
            .chain(edges.keys())
            .map(|id| id.get())
            .max()
            .map_or(Some(0), |max| max.checked_add(1))
            .ok_or_else(exhausted)?;

        let tree = Self {
            origin_id,
            nodes,
            edges,
            ids: IdAllocator::starting_at(next),
        };

        // With one root and one parent per node, the only remaining defect
        // is a detached cycle.
        let reachable = tree.subtree_ids(origin_id).len();
        if reachable != tree.nodes.len() {
            return Err(AdventureError::Structural(format!(
                "{} nodes are unreachable from the origin",
                tree.nodes.len() - reachable
            )));
        }

        Ok(tree)
    }

    /// Returns the origin node id.
    #[must_use]
    pub fn origin_id(&self) -> StructuralId {
        self.origin_id
    }

    /// Returns the origin node. The origin can never be pruned.
    #[must_use]
    pub fn origin(&self) -> &Node<T> {
        &self.nodes[&self.origin_id]
    }

    /// Returns the id the next allocation will use.
    #[must_use]
    pub fn next_id(&self) -> StructuralId {
        self.ids.peek()
    }

    /// Returns `true` if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: StructuralId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.values()
    }

    /// Iterates over all edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Looks up a node.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent.
    pub fn node(&self, id: StructuralId) -> Result<&Node<T>, AdventureError> {
        self.nodes.get(&id).ok_or(AdventureError::NodeNotFound(id))
    }

    /// Swaps a node's payload, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent.
    pub fn replace_data(&mut self, id: StructuralId, data: T) -> Result<T, AdventureError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(AdventureError::NodeNotFound(id))?;
        Ok(std::mem::replace(&mut node.data, data))
    }

    /// Appends a child under `parent_id` and returns the new node id.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `parent_id` is absent, or
    /// `AdventureError::Structural` if the id space is exhausted.
    pub fn add_child(
        &mut self,
        parent_id: StructuralId,
        data: T,
    ) -> Result<StructuralId, AdventureError> {
        self.node(parent_id)?;
        self.ids.ensure_available(2)?;
        self.insert_child(parent_id, data)
    }

    /// Appends several children under `parent_id`, in order.
    ///
    /// The parent and the remaining id space are checked before any id is
    /// allocated, so either every child is inserted or none is.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `parent_id` is absent, or
    /// `AdventureError::Structural` if too few ids remain for the batch.
    pub fn add_children<I>(
        &mut self,
        parent_id: StructuralId,
        data: I,
    ) -> Result<Vec<StructuralId>, AdventureError>
    where
        I: IntoIterator<Item = T>,
    {
        self.node(parent_id)?;
        let data: Vec<T> = data.into_iter().collect();
        self.ids.ensure_available(data.len().saturating_mul(2))?;
        data.into_iter()
            .map(|item| self.insert_child(parent_id, item))
            .collect()
    }

    fn insert_child(
        &mut self,
        parent_id: StructuralId,
        data: T,
    ) -> Result<StructuralId, AdventureError> {
        let edge_id = self.ids.allocate()?;
        let node_id = self.ids.allocate()?;
        self.edges.insert(
            edge_id,
            Edge {
                id: edge_id,
                source: parent_id,
                target: node_id,
            },
        );
        self.nodes.insert(node_id, Node { id: node_id, data });
        Ok(node_id)
    }

    /// Returns the ids of `id`'s children in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent.
    pub fn child_ids(&self, id: StructuralId) -> Result<Vec<StructuralId>, AdventureError> {
        self.node(id)?;
        Ok(self.outgoing_targets(id).collect())
    }

    /// Returns `id`'s children in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent, or
    /// `AdventureError::Structural` if an edge points at a missing node.
    pub fn children(&self, id: StructuralId) -> Result<Vec<&Node<T>>, AdventureError> {
        self.child_ids(id)?
            .into_iter()
            .map(|child| {
                self.nodes.get(&child).ok_or_else(|| {
                    AdventureError::Structural(format!("edge from {id} targets missing node {child}"))
                })
            })
            .collect()
    }

    /// Returns `true` if `id` has at least one child.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent.
    pub fn has_children(&self, id: StructuralId) -> Result<bool, AdventureError> {
        self.node(id)?;
        Ok(self.outgoing_targets(id).next().is_some())
    }

    /// Returns the parent id of `id`, or `None` for the origin.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent, or
    /// `AdventureError::Structural` if a non-origin node has no incoming edge.
    pub fn parent_id(&self, id: StructuralId) -> Result<Option<StructuralId>, AdventureError> {
        if id == self.origin_id {
            return Ok(None);
        }
        self.node(id)?;
        self.edges
            .values()
            .find(|edge| edge.target == id)
            .map(|edge| Some(edge.source))
            .ok_or_else(|| AdventureError::Structural(format!("node {id} has no parent edge")))
    }

    /// Returns the parent node of `id`, or `None` for the origin.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent, or
    /// `AdventureError::Structural` if the parent link is broken.
    pub fn parent(&self, id: StructuralId) -> Result<Option<&Node<T>>, AdventureError> {
        match self.parent_id(id)? {
            None => Ok(None),
            Some(parent) => self.nodes.get(&parent).map(Some).ok_or_else(|| {
                AdventureError::Structural(format!("node {id} points at missing parent {parent}"))
            }),
        }
    }

    /// Returns the ids from the origin down to `id`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::NodeNotFound` if `id` is absent, or
    /// `AdventureError::Structural` if a parent link is broken or loops.
    pub fn path_to_root(&self, id: StructuralId) -> Result<Vec<StructuralId>, AdventureError> {
        self.node(id)?;
        let mut path = vec![id];
        let mut current = id;
        while current != self.origin_id {
            if path.len() > self.nodes.len() {
                return Err(AdventureError::Structural(format!(
                    "parent chain from {id} never reaches the origin"
                )));
            }
            let parent = self.parent_id(current)?.ok_or_else(|| {
                AdventureError::Structural(format!("node {current} has no parent"))
            })?;
            if !self.nodes.contains_key(&parent) {
                return Err(AdventureError::Structural(format!(
                    "node {current} points at missing parent {parent}"
                )));
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Returns the number of edges between the origin and `id`.
    ///
    /// # Errors
    ///
    /// Same as [`path_to_root`](Self::path_to_root).
    pub fn depth(&self, id: StructuralId) -> Result<usize, AdventureError> {
        Ok(self.path_to_root(id)?.len() - 1)
    }

    /// Removes `id`, all its descendants, and every edge touching them.
    /// Returns the removed node ids, `id` first.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Structural` if `id` is the origin, or
    /// `AdventureError::NodeNotFound` if `id` is absent.
    pub fn prune(&mut self, id: StructuralId) -> Result<Vec<StructuralId>, AdventureError> {
        if id == self.origin_id {
            return Err(AdventureError::Structural("the origin node cannot be pruned".into()));
        }
        self.node(id)?;

        let removed = self.subtree_ids(id);
        let doomed: HashSet<StructuralId> = removed.iter().copied().collect();
        self.nodes.retain(|node_id, _| !doomed.contains(node_id));
        self.edges
            .retain(|_, edge| !doomed.contains(&edge.target) && !doomed.contains(&edge.source));
        Ok(removed)
    }

    /// Collects `id` and its descendants, depth first, with an explicit stack.
    fn subtree_ids(&self, id: StructuralId) -> Vec<StructuralId> {
        let mut collected = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            collected.push(current);
            let mut children: Vec<StructuralId> = self.outgoing_targets(current).collect();
            children.reverse();
            stack.extend(children);
        }
        collected
    }

    fn outgoing_targets(&self, id: StructuralId) -> impl Iterator<Item = StructuralId> + '_ {
        self.edges
            .values()
            .filter(move |edge| edge.source == id)
            .map(|edge| edge.target)
    }
}

impl<T: Clone> Tree<T> {
    /// Copies the node and edge maps out for storage.
    #[must_use]
    pub fn to_serialized(&self) -> SerializedTree<T> {
        SerializedTree {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}
