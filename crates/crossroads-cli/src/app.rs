//! Subcommand dispatch.

use std::io::Write;

use crossroads_core::clock::Clock;
use crossroads_core::command::new_correlation_id;
use crossroads_core::error::AdventureError;
use crossroads_core::event::DiscardingPublisher;
use crossroads_core::repository::BlobStore;
use crossroads_core::tree::StructuralId;
use crossroads_narrative::application::command_handlers::handle_prune_node;
use crossroads_narrative::application::lifecycle::{
    delete_adventure, export_adventure, import_adventure, list_adventure_summaries,
    load_adventure, save_adventure,
};
use crossroads_narrative::application::query_handlers::{
    export_album_markdown, get_node_view, get_transcript,
};
use crossroads_narrative::domain::aggregates::Adventure;
use crossroads_narrative::domain::commands::PruneNode;
use crossroads_narrative::domain::nodes::Album;
use tracing::info;

use crate::cli::Command;
use crate::error::AppError;

/// Runs one subcommand against `store`, writing its output to `out`.
///
/// # Errors
///
/// Returns `AppError::Domain` for adventure failures (unknown ids, malformed
/// documents, store errors) and `AppError::Io` if `out` or an input file
/// fails.
pub async fn run(
    command: Command,
    store: &dyn BlobStore,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    match command {
        Command::List => {
            for summary in list_adventure_summaries(store).await? {
                writeln!(
                    out,
                    "{}\t{} by {}\t{} albums, {} directions",
                    summary.id,
                    summary.album_name,
                    summary.artist_name,
                    summary.album_count,
                    summary.direction_count
                )?;
            }
        }
        Command::Create {
            album,
            artist,
            criteria,
        } => {
            if album.trim().is_empty() || artist.trim().is_empty() {
                return Err(AdventureError::Validation(
                    "both --album and --artist are required".into(),
                )
                .into());
            }
            let starting_album = Album::bare(album.trim(), artist.trim());
            let adventure = Adventure::create(clock, starting_album, criteria);
            save_adventure(&adventure, store).await?;
            writeln!(out, "{}", adventure.id)?;
        }
        Command::Show { id, node } => {
            let adventure = load_adventure(&id, store).await?;
            let node = node.unwrap_or_else(|| adventure.tree().origin_id());
            let view = get_node_view(&adventure, node)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        }
        Command::Transcript { id, node } => {
            let adventure = load_adventure(&id, store).await?;
            let node = node.unwrap_or_else(|| adventure.tree().origin_id());
            for message in get_transcript(&adventure, node)? {
                writeln!(out, "[{}]\n{}\n", message.role, message.content)?;
            }
        }
        Command::Export {
            id,
            markdown: Some(node),
            title,
        } => {
            let adventure = load_adventure(&id, store).await?;
            write!(out, "{}", export_album_markdown(&adventure, node, title)?)?;
        }
        Command::Export {
            id, markdown: None, ..
        } => {
            writeln!(out, "{}", export_adventure(&id, store).await?)?;
        }
        Command::Import { file } => {
            let json = tokio::fs::read_to_string(&file).await?;
            let adventure = import_adventure(&json, clock, store).await?;
            info!(adventure_id = %adventure.id, file = %file.display(), "adventure imported");
            writeln!(out, "{}", adventure.id)?;
        }
        Command::Prune { id, node } => {
            let mut adventure = load_adventure(&id, store).await?;
            let removed = prune(&mut adventure, node, clock)?;
            save_adventure(&adventure, store).await?;
            writeln!(out, "removed {} nodes", removed.len())?;
        }
        Command::Delete { id } => {
            load_adventure(&id, store).await?;
            delete_adventure(&id, store).await?;
            writeln!(out, "deleted {id}")?;
        }
    }
    Ok(())
}

fn prune(
    adventure: &mut Adventure,
    node_id: StructuralId,
    clock: &dyn Clock,
) -> Result<Vec<StructuralId>, AppError> {
    let command = PruneNode {
        correlation_id: new_correlation_id(),
        node_id,
    };
    Ok(handle_prune_node(&command, adventure, clock, &DiscardingPublisher)?)
}
