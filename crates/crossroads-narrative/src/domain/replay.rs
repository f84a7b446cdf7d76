//! Replay of a tree path into a generation transcript.
//!
//! The generator keeps no memory between calls, so every request carries
//! the whole conversation that would have led to the target node: the
//! system instruction, the setup prompt, then alternating listener
//! selections and summaries of what was offered at each step. A node that
//! has not been expanded yet simply ends the transcript.

use crossroads_core::error::AdventureError;
use crossroads_core::generation::ChatMessage;
use crossroads_core::tree::StructuralId;
use serde::Serialize;

use super::nodes::{AdventureNode, AdventureTree, Album, NodePayload};
use super::prompt::{SYSTEM_INSTRUCTION, custom_direction_request, setup_prompt};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlbumSummary<'a> {
    album_name: &'a str,
    artist_name: &'a str,
    description: &'a str,
    options: Vec<OptionSummary<'a>>,
}

#[derive(Serialize)]
struct OptionSummary<'a> {
    index: &'a str,
    direction: &'a str,
}

#[derive(Serialize)]
struct DirectionSummary<'a> {
    albums: Vec<SuggestionSummary<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionSummary<'a> {
    index: &'a str,
    album_name: &'a str,
    artist_name: &'a str,
    description: &'a str,
}

/// Rebuilds the transcript that briefs the generator on everything up to
/// and including `target`.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if `target` or any node on its
/// path is missing, or `AdventureError::Structural` if the origin is not an
/// album or a child breaks alternation.
pub fn replay(
    tree: &AdventureTree,
    criteria: &[String],
    target: StructuralId,
) -> Result<Vec<ChatMessage>, AdventureError> {
    let path = tree.path_to_root(target)?;
    let origin = tree.origin();
    let starting_album = origin_album(origin)?;

    let mut transcript = vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::assistant(setup_prompt(starting_album, criteria)?),
    ];

    if target == origin.id && !tree.has_children(origin.id)? {
        return Ok(transcript);
    }
    transcript.push(ChatMessage::assistant(summarize_children(tree, origin)?));

    for &id in path.iter().skip(1) {
        let node = tree.node(id)?;
        transcript.push(ChatMessage::user(selection_message(&node.data)));
        if !tree.has_children(id)? {
            break;
        }
        transcript.push(ChatMessage::assistant(summarize_children(tree, node)?));
    }

    Ok(transcript)
}

/// Replays `target` and appends one further listener message, such as a
/// request for more options.
///
/// # Errors
///
/// Same as [`replay`].
pub fn replay_with_request(
    tree: &AdventureTree,
    criteria: &[String],
    target: StructuralId,
    request: impl Into<String>,
) -> Result<Vec<ChatMessage>, AdventureError> {
    let mut transcript = replay(tree, criteria, target)?;
    transcript.push(ChatMessage::user(request));
    Ok(transcript)
}

fn origin_album(origin: &AdventureNode) -> Result<&Album, AdventureError> {
    origin.data.as_album().ok_or_else(|| {
        AdventureError::Structural(format!("origin node {} is not an album", origin.id))
    })
}

/// What the listener said to arrive at this node.
fn selection_message(payload: &NodePayload) -> String {
    match payload {
        NodePayload::Direction(direction) if direction.custom => {
            custom_direction_request(&direction.label)
        }
        other => other.selection_index().to_owned(),
    }
}

/// Renders what the generator offered at `node`, from its children.
fn summarize_children(tree: &AdventureTree, node: &AdventureNode) -> Result<String, AdventureError> {
    let children = tree.children(node.id)?;
    let rendered = match &node.data {
        NodePayload::Album(album) => {
            let options = children
                .iter()
                .map(|child| {
                    child
                        .data
                        .as_direction()
                        .map(|direction| OptionSummary {
                            index: &direction.selection_index,
                            direction: &direction.label,
                        })
                        .ok_or_else(|| misplaced(node, child))
                })
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_string_pretty(&AlbumSummary {
                album_name: &album.name,
                artist_name: &album.creator,
                description: &album.description,
                options,
            })
        }
        NodePayload::Direction(_) => {
            let albums = children
                .iter()
                .map(|child| {
                    child
                        .data
                        .as_album()
                        .map(|album| SuggestionSummary {
                            index: &album.selection_index,
                            album_name: &album.name,
                            artist_name: &album.creator,
                            description: &album.description,
                        })
                        .ok_or_else(|| misplaced(node, child))
                })
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_string_pretty(&DirectionSummary { albums })
        }
    };
    rendered.map_err(|e| AdventureError::Infrastructure(format!("summary rendering failed: {e}")))
}

fn misplaced(parent: &AdventureNode, child: &AdventureNode) -> AdventureError {
    AdventureError::Structural(format!(
        "node {} ({}) is a child of node {} ({})",
        child.id,
        child.data.kind(),
        parent.id,
        parent.data.kind()
    ))
}
