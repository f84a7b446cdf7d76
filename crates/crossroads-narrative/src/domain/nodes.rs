//! Node payloads for the adventure tree.
//!
//! An adventure alternates between two kinds of node: albums (the origin
//! and every even depth) and directions (every odd depth). The kind is an
//! explicit enum discriminant, stored as `"kind"` in persisted documents.

use std::fmt;

use crossroads_core::tree::{Node, Tree};
use serde::{Deserialize, Serialize};

/// A record in the adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Token the listener uses to pick this album among its siblings.
    #[serde(rename = "index")]
    pub selection_index: String,
    /// Album title.
    #[serde(rename = "albumName")]
    pub name: String,
    /// Recording artist.
    #[serde(rename = "artistName")]
    pub creator: String,
    /// One-sentence description.
    #[serde(default)]
    pub description: String,
    /// Cover art URL, when the catalogue had one.
    #[serde(rename = "coverUrl", default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl Album {
    /// An album known only by title and artist, as entered by the listener
    /// before any description or cover has been fetched.
    #[must_use]
    pub fn bare(name: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            selection_index: "0".to_owned(),
            name: name.into(),
            creator: creator.into(),
            description: String::new(),
            cover_url: None,
        }
    }
}

/// A musical direction offered after an album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direction {
    /// Token the listener uses to pick this direction among its siblings.
    #[serde(rename = "index")]
    pub selection_index: String,
    /// Human-readable direction, e.g. "Something that is more acoustic".
    #[serde(rename = "direction", alias = "description")]
    pub label: String,
    /// `true` when the listener typed this direction instead of picking an
    /// offered one.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom: bool,
}

/// Discriminant of a [`NodePayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An [`Album`].
    Album,
    /// A [`Direction`].
    Direction,
}

impl NodeKind {
    /// The kind every child of a node of this kind must have.
    #[must_use]
    pub const fn child_kind(self) -> Self {
        match self {
            Self::Album => Self::Direction,
            Self::Direction => Self::Album,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Album => "album",
            Self::Direction => "direction",
        })
    }
}

/// Payload of an adventure tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodePayload {
    /// An album node.
    Album(Album),
    /// A direction node.
    Direction(Direction),
}

impl NodePayload {
    /// Returns the payload's discriminant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Album(_) => NodeKind::Album,
            Self::Direction(_) => NodeKind::Direction,
        }
    }

    /// Returns `true` for album payloads.
    #[must_use]
    pub const fn is_album(&self) -> bool {
        matches!(self, Self::Album(_))
    }

    /// Returns the selection index shared by both kinds.
    #[must_use]
    pub fn selection_index(&self) -> &str {
        match self {
            Self::Album(album) => &album.selection_index,
            Self::Direction(direction) => &direction.selection_index,
        }
    }

    /// Returns the album, if this is one.
    #[must_use]
    pub const fn as_album(&self) -> Option<&Album> {
        match self {
            Self::Album(album) => Some(album),
            Self::Direction(_) => None,
        }
    }

    /// Returns the direction, if this is one.
    #[must_use]
    pub const fn as_direction(&self) -> Option<&Direction> {
        match self {
            Self::Direction(direction) => Some(direction),
            Self::Album(_) => None,
        }
    }
}

impl From<Album> for NodePayload {
    fn from(album: Album) -> Self {
        Self::Album(album)
    }
}

impl From<Direction> for NodePayload {
    fn from(direction: Direction) -> Self {
        Self::Direction(direction)
    }
}

/// The adventure's tree.
pub type AdventureTree = Tree<NodePayload>;

/// A node of the adventure's tree.
pub type AdventureNode = Node<NodePayload>;

/// Returns the selection index at `position` in the sequence
/// `a, b, ..., z, aa, ab, ...`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn selection_index_for(position: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = position;
    loop {
        letters.push(char::from(b'a' + (remaining % 26) as u8));
        if remaining < 26 {
            break;
        }
        remaining = remaining / 26 - 1;
    }
    letters.iter().rev().collect()
}
