//! Commands for the adventure context.
//!
//! Each command targets the adventure handed to its handler alongside it.

use crossroads_core::command::Command;
use crossroads_core::tree::StructuralId;
use uuid::Uuid;

use super::nodes::NodePayload;

/// Command to replace the origin with a freshly described starting album.
#[derive(Debug, Clone)]
pub struct SetStartingAlbum {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Album title.
    pub name: String,
    /// Recording artist.
    pub creator: String,
}

impl Command for SetStartingAlbum {
    fn command_type(&self) -> &'static str {
        "adventure.set_starting_album"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to offer the first directions after the starting album.
#[derive(Debug, Clone)]
pub struct PopulateFirstAlbumDirections {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for PopulateFirstAlbumDirections {
    fn command_type(&self) -> &'static str {
        "adventure.populate_first_album_directions"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to follow one of the directions offered after an album.
#[derive(Debug, Clone)]
pub struct ChooseDirection {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The album whose direction is chosen.
    pub album_id: StructuralId,
    /// Selection index of the chosen direction.
    pub selection_index: String,
}

impl Command for ChooseDirection {
    fn command_type(&self) -> &'static str {
        "adventure.choose_direction"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to pick one of the albums suggested for a direction.
#[derive(Debug, Clone)]
pub struct ChooseAlbum {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The direction whose album is chosen.
    pub direction_id: StructuralId,
    /// Selection index of the chosen album.
    pub selection_index: String,
}

impl Command for ChooseAlbum {
    fn command_type(&self) -> &'static str {
        "adventure.choose_album"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to ask for further directions after an album.
#[derive(Debug, Clone)]
pub struct RequestMoreDirections {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The album to extend.
    pub album_id: StructuralId,
}

impl Command for RequestMoreDirections {
    fn command_type(&self) -> &'static str {
        "adventure.request_more_directions"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to ask for further album suggestions for a direction.
#[derive(Debug, Clone)]
pub struct RequestMoreAlbums {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The direction to extend.
    pub direction_id: StructuralId,
}

impl Command for RequestMoreAlbums {
    fn command_type(&self) -> &'static str {
        "adventure.request_more_albums"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to follow a direction the listener typed themselves.
#[derive(Debug, Clone)]
pub struct ChooseCustomDirection {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The album to branch from.
    pub album_id: StructuralId,
    /// The direction as typed.
    pub label: String,
}

impl Command for ChooseCustomDirection {
    fn command_type(&self) -> &'static str {
        "adventure.choose_custom_direction"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to insert a node by hand.
#[derive(Debug, Clone)]
pub struct AddNode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Parent of the new node.
    pub parent_id: StructuralId,
    /// Payload of the new node.
    pub payload: NodePayload,
}

impl Command for AddNode {
    fn command_type(&self) -> &'static str {
        "adventure.add_node"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to remove a node and everything below it.
#[derive(Debug, Clone)]
pub struct PruneNode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Root of the subtree to remove.
    pub node_id: StructuralId,
}

impl Command for PruneNode {
    fn command_type(&self) -> &'static str {
        "adventure.prune_node"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_report_distinct_types_and_their_correlation_id() {
        // Arrange
        let correlation_id = Uuid::new_v4();
        let node_id = StructuralId::new(2);
        let commands: Vec<Box<dyn Command>> = vec![
            Box::new(SetStartingAlbum {
                correlation_id,
                name: "A".into(),
                creator: "X".into(),
            }),
            Box::new(PopulateFirstAlbumDirections { correlation_id }),
            Box::new(ChooseDirection {
                correlation_id,
                album_id: node_id,
                selection_index: "a".into(),
            }),
            Box::new(ChooseAlbum {
                correlation_id,
                direction_id: node_id,
                selection_index: "a".into(),
            }),
            Box::new(RequestMoreDirections {
                correlation_id,
                album_id: node_id,
            }),
            Box::new(RequestMoreAlbums {
                correlation_id,
                direction_id: node_id,
            }),
            Box::new(ChooseCustomDirection {
                correlation_id,
                album_id: node_id,
                label: "more brass".into(),
            }),
            Box::new(PruneNode {
                correlation_id,
                node_id,
            }),
        ];

        // Act
        let types: std::collections::HashSet<&str> =
            commands.iter().map(|command| command.command_type()).collect();

        // Assert
        assert_eq!(types.len(), commands.len());
        assert!(types.iter().all(|t| t.starts_with("adventure.")));
        assert!(commands.iter().all(|command| command.correlation_id() == correlation_id));
    }
}
