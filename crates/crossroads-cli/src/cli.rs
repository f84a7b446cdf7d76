//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crossroads_core::tree::StructuralId;

/// Inspect and maintain stored music adventures.
#[derive(Debug, Parser)]
#[command(name = "crossroads", version, about)]
#[command(long_about = "Inspect and maintain stored music adventures.

ENVIRONMENT VARIABLES:
  CROSSROADS_DATA_DIR   Directory holding adventures (default: ./adventures)
  RUST_LOG              Log filter (default: info)")]
pub struct Cli {
    /// Directory holding adventures. Overrides `CROSSROADS_DATA_DIR`.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stored adventures with their starting album and size.
    List,

    /// Start a new adventure from an album.
    Create {
        /// Album title.
        #[arg(long)]
        album: String,
        /// Recording artist.
        #[arg(long)]
        artist: String,
        /// A constraint every suggestion must meet. Repeatable.
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },

    /// Show one node and its children as JSON.
    Show {
        /// Adventure id.
        id: String,
        /// Node to show. Defaults to the origin.
        #[arg(long)]
        node: Option<StructuralId>,
    },

    /// Print the transcript the generator would receive at a node.
    Transcript {
        /// Adventure id.
        id: String,
        /// Node to replay. Defaults to the origin.
        #[arg(long)]
        node: Option<StructuralId>,
    },

    /// Print an adventure's document, or an album as a markdown note.
    Export {
        /// Adventure id.
        id: String,
        /// Render this album node as markdown instead of exporting JSON.
        #[arg(long)]
        markdown: Option<StructuralId>,
        /// Prefix the markdown note with a title line.
        #[arg(long, requires = "markdown")]
        title: bool,
    },

    /// Store an exported document as a new adventure.
    Import {
        /// File holding the exported JSON.
        file: PathBuf,
    },

    /// Remove a node and everything below it.
    Prune {
        /// Adventure id.
        id: String,
        /// Root of the subtree to remove.
        node: StructuralId,
    },

    /// Delete an adventure.
    Delete {
        /// Adventure id.
        id: String,
    },
}
