//! Query handlers for the adventure context.
//!
//! Read-only views over a loaded adventure: single nodes, replay
//! transcripts, a per-adventure summary and a markdown note for an album.

use crossroads_core::error::AdventureError;
use crossroads_core::generation::ChatMessage;
use crossroads_core::tree::StructuralId;
use serde::Serialize;

use crate::domain::aggregates::Adventure;
use crate::domain::nodes::NodePayload;

/// Read-only view of one node and its neighbourhood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    /// The node identifier.
    pub id: StructuralId,
    /// Distance from the origin.
    pub depth: usize,
    /// The parent, `None` for the origin.
    pub parent_id: Option<StructuralId>,
    /// The node's payload.
    pub payload: NodePayload,
    /// Children, in insertion order.
    pub children: Vec<NodeView>,
}

/// Read-only summary of an adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdventureSummaryView {
    /// The adventure identifier.
    pub id: String,
    /// Starting album title.
    pub album_name: String,
    /// Starting album artist.
    pub artist_name: String,
    /// Album nodes, the origin included.
    pub album_count: usize,
    /// Direction nodes.
    pub direction_count: usize,
}

/// Returns a node with its immediate children.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if `id` is absent.
pub fn get_node_view(adventure: &Adventure, id: StructuralId) -> Result<NodeView, AdventureError> {
    let tree = adventure.tree();
    let depth = tree.depth(id)?;
    let children = tree
        .children(id)?
        .into_iter()
        .map(|child| NodeView {
            id: child.id,
            depth: depth + 1,
            parent_id: Some(id),
            payload: child.data.clone(),
            children: Vec::new(),
        })
        .collect();

    Ok(NodeView {
        id,
        depth,
        parent_id: tree.parent_id(id)?,
        payload: tree.node(id)?.data.clone(),
        children,
    })
}

/// Returns the transcript the generator would receive to continue from
/// `id`.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if `id` is absent.
pub fn get_transcript(
    adventure: &Adventure,
    id: StructuralId,
) -> Result<Vec<ChatMessage>, AdventureError> {
    adventure.transcript_at(id)
}

/// Summarizes an adventure for listings.
///
/// # Errors
///
/// Returns `AdventureError::Structural` if the origin is not an album.
pub fn summarize(adventure: &Adventure) -> Result<AdventureSummaryView, AdventureError> {
    let album = adventure.starting_album()?;
    Ok(AdventureSummaryView {
        id: adventure.id.clone(),
        album_name: album.name.clone(),
        artist_name: album.creator.clone(),
        album_count: adventure.album_count(),
        direction_count: adventure.direction_count(),
    })
}

/// Renders an album node as a markdown note: optional title, description,
/// a search link, then each direction taken from it followed by wiki links
/// to the albums suggested for that direction.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if `id` is absent, or
/// `AdventureError::Validation` if it is not an album.
pub fn export_album_markdown(
    adventure: &Adventure,
    id: StructuralId,
    with_title: bool,
) -> Result<String, AdventureError> {
    let tree = adventure.tree();
    let album = tree
        .node(id)?
        .data
        .as_album()
        .ok_or_else(|| AdventureError::Validation(format!("node {id} is not an album")))?;

    let mut markdown = String::new();
    if with_title {
        markdown.push_str(&format!("# {}, {}\n", title_safe(&album.name), album.creator));
    }
    markdown.push_str(&format!("{}\n", album.description));
    markdown.push_str(&format!(
        "[YouTube Album Link](https://www.youtube.com/results?search_query={}+{}+full+album)\n\n",
        url_safe(&album.creator),
        url_safe(&album.name)
    ));

    for child in tree.children(id)? {
        let Some(direction) = child.data.as_direction() else {
            continue;
        };
        markdown.push_str(&format!("{}\n", direction.label));
        for grandchild in tree.children(child.id)? {
            if let Some(suggestion) = grandchild.data.as_album() {
                markdown.push_str(&format!("-  [[{}, {}]]\n", suggestion.name, suggestion.creator));
            }
        }
    }
    Ok(markdown)
}

/// Keeps ASCII letters, digits and spaces, and joins words with `+`.
fn url_safe(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .map(|c| if c == ' ' { '+' } else { c })
        .collect()
}

/// Drops characters that are not allowed in note file names.
fn title_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '*' | '"' | '\\' | '/' | '<' | '>' | ':' | '|' | '?'))
        .collect()
}
