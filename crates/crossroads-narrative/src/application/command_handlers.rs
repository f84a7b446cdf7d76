//! Command handlers for the adventure context.
//!
//! Each handler validates its command against the adventure, replays the
//! transcript for the node being grown, asks the generator to continue it,
//! validates the reply and commits the new children in one batch. Events
//! the aggregate records along the way are published before returning,
//! whether the command succeeded or not.

use crossroads_core::clock::Clock;
use crossroads_core::command::Command;
use crossroads_core::error::AdventureError;
use crossroads_core::event::EventPublisher;
use crossroads_core::generation::{ChatMessage, TextGenerator};
use crossroads_core::metadata::CoverLookup;
use crossroads_core::tree::StructuralId;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::Adventure;
use crate::domain::commands::{
    AddNode, ChooseAlbum, ChooseCustomDirection, ChooseDirection, PopulateFirstAlbumDirections,
    PruneNode, RequestMoreAlbums, RequestMoreDirections, SetStartingAlbum,
};
use crate::domain::events::AdventureEvent;
use crate::domain::nodes::{Album, Direction, NodeKind, NodePayload};
use crate::domain::prompt::{
    MORE_OPTIONS_REQUEST, SYSTEM_INSTRUCTION, album_summary_request, custom_direction_request,
};
use crate::domain::responses::{
    clean_description, ensure_fresh_indices, parse_album_suggestions, parse_direction_options,
};

/// Collaborators every command handler needs.
#[derive(Clone, Copy)]
pub struct AdventureServices<'a> {
    /// Time source for event timestamps.
    pub clock: &'a dyn Clock,
    /// Stateless text generator.
    pub generator: &'a dyn TextGenerator,
    /// Cover art catalogue.
    pub covers: &'a dyn CoverLookup,
    /// Sink for the events each command produces.
    pub publisher: &'a dyn EventPublisher<AdventureEvent>,
}

/// What a generator reply is expected to hold.
#[derive(Debug, Clone, Copy)]
enum Expansion {
    Directions,
    Albums,
}

impl Expansion {
    const fn for_parent(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Album => Self::Directions,
            NodeKind::Direction => Self::Albums,
        }
    }
}

fn publish_pending(adventure: &mut Adventure, publisher: &dyn EventPublisher<AdventureEvent>) {
    for event in adventure.take_uncommitted_events() {
        publisher.publish(&event);
    }
}

/// Asks the generator to continue `transcript` and turns the reply into
/// payloads, covers included. Nothing touches the tree here.
///
/// `taken` holds the selection indices the parent's children already use;
/// a reply reusing one of them is rejected.
async fn fetch_children(
    transcript: &[ChatMessage],
    expansion: Expansion,
    taken: &[&str],
    services: &AdventureServices<'_>,
) -> Result<Vec<NodePayload>, AdventureError> {
    debug!(messages = transcript.len(), ?expansion, "requesting continuation");
    let raw = services.generator.generate(transcript).await?;

    match expansion {
        Expansion::Directions => {
            let directions = parse_direction_options(&raw)?;
            ensure_fresh_indices(
                &raw,
                taken,
                directions.iter().map(|d| d.selection_index.as_str()),
            )?;
            Ok(directions.into_iter().map(NodePayload::from).collect())
        }
        Expansion::Albums => {
            let albums = parse_album_suggestions(&raw)?;
            ensure_fresh_indices(&raw, taken, albums.iter().map(|a| a.selection_index.as_str()))?;
            let mut payloads = Vec::with_capacity(albums.len());
            for mut album in albums {
                album.cover_url = services
                    .covers
                    .lookup_cover(&album.name, &album.creator)
                    .await?;
                if album.cover_url.is_none() {
                    warn!(name = %album.name, creator = %album.creator, "no cover found");
                }
                payloads.push(NodePayload::from(album));
            }
            Ok(payloads)
        }
    }
}

/// Runs one generating round trip under `parent_id`, bracketed by the
/// loading signal.
async fn expand(
    adventure: &mut Adventure,
    parent_id: StructuralId,
    transcript: Vec<ChatMessage>,
    correlation_id: Uuid,
    services: &AdventureServices<'_>,
) -> Result<Vec<StructuralId>, AdventureError> {
    let expansion = Expansion::for_parent(adventure.tree().node(parent_id)?.data.kind());
    let siblings: Vec<String> = adventure
        .tree()
        .children(parent_id)?
        .iter()
        .map(|child| child.data.selection_index().to_owned())
        .collect();
    let taken: Vec<&str> = siblings.iter().map(String::as_str).collect();

    adventure.set_loading(true, correlation_id, services.clock);
    publish_pending(adventure, services.publisher);

    let outcome = match fetch_children(&transcript, expansion, &taken, services).await {
        Ok(payloads) => adventure.add_children(parent_id, payloads, correlation_id, services.clock),
        Err(error) => Err(error),
    };

    adventure.set_loading(false, correlation_id, services.clock);
    publish_pending(adventure, services.publisher);

    match &outcome {
        Ok(ids) => info!(parent = %parent_id, added = ids.len(), "children committed"),
        Err(error) => warn!(parent = %parent_id, %error, "expansion failed, tree unchanged"),
    }
    outcome
}

/// Handles the `SetStartingAlbum` command: fetches a one-sentence
/// description and a cover for the album and installs it as the origin.
///
/// # Errors
///
/// Returns `AdventureError::Validation` for a blank name or creator, and
/// propagates generator, cover lookup and structural errors.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_set_starting_album(
    command: &SetStartingAlbum,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<(), AdventureError> {
    let name = command.name.trim();
    let creator = command.creator.trim();
    if name.is_empty() {
        return Err(AdventureError::Validation("an album name is required".into()));
    }
    if creator.is_empty() {
        return Err(AdventureError::Validation("an artist name is required".into()));
    }
    info!(%name, %creator, "setting starting album");

    adventure.set_loading(true, command.correlation_id, services.clock);
    publish_pending(adventure, services.publisher);

    let outcome = async {
        let transcript = [
            ChatMessage::system(SYSTEM_INSTRUCTION),
            ChatMessage::user(album_summary_request(name, creator)),
        ];
        let description = clean_description(&services.generator.generate(&transcript).await?);
        let cover_url = services.covers.lookup_cover(name, creator).await?;
        adventure.set_starting_album(
            Album {
                description,
                cover_url,
                ..Album::bare(name, creator)
            },
            command.correlation_id,
            services.clock,
        )
    }
    .await;

    adventure.set_loading(false, command.correlation_id, services.clock);
    publish_pending(adventure, services.publisher);
    outcome
}

/// Handles the `PopulateFirstAlbumDirections` command: offers the first
/// directions under the origin.
///
/// # Errors
///
/// Propagates generator, validation and structural errors. The tree is
/// unchanged on error.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_populate_first_album_directions(
    command: &PopulateFirstAlbumDirections,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<Vec<StructuralId>, AdventureError> {
    let origin = adventure.tree().origin_id();
    let transcript = adventure.transcript_at(origin)?;
    expand(adventure, origin, transcript, command.correlation_id, services).await
}

/// Handles the `ChooseDirection` command: suggests albums for the chosen
/// direction under `album_id`.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` or
/// `AdventureError::SelectionNotFound` if the direction cannot be
/// resolved, and propagates generator, cover lookup and structural errors.
/// The tree is unchanged on error.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_choose_direction(
    command: &ChooseDirection,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<Vec<StructuralId>, AdventureError> {
    expect_kind(adventure, command.album_id, NodeKind::Album)?;
    let direction_id = adventure.find_child(command.album_id, &command.selection_index)?;
    info!(album = %command.album_id, selection = %command.selection_index, "direction chosen");
    let transcript = adventure.transcript_at(direction_id)?;
    expand(adventure, direction_id, transcript, command.correlation_id, services).await
}

/// Handles the `ChooseAlbum` command: offers directions after the chosen
/// album under `direction_id`.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` or
/// `AdventureError::SelectionNotFound` if the album cannot be resolved, and
/// propagates generator and structural errors. The tree is unchanged on
/// error.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_choose_album(
    command: &ChooseAlbum,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<Vec<StructuralId>, AdventureError> {
    expect_kind(adventure, command.direction_id, NodeKind::Direction)?;
    let album_id = adventure.find_child(command.direction_id, &command.selection_index)?;
    info!(direction = %command.direction_id, selection = %command.selection_index, "album chosen");
    let transcript = adventure.transcript_at(album_id)?;
    expand(adventure, album_id, transcript, command.correlation_id, services).await
}

/// Handles the `RequestMoreDirections` command: appends further directions
/// after the existing ones under `album_id`.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if the album is absent,
/// `AdventureError::Validation` if it is a direction, and propagates
/// generator and structural errors.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_request_more_directions(
    command: &RequestMoreDirections,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<Vec<StructuralId>, AdventureError> {
    expect_kind(adventure, command.album_id, NodeKind::Album)?;
    let transcript = adventure.transcript_with_request(command.album_id, MORE_OPTIONS_REQUEST)?;
    expand(adventure, command.album_id, transcript, command.correlation_id, services).await
}

/// Handles the `RequestMoreAlbums` command: appends further suggestions
/// after the existing ones under `direction_id`.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if the direction is absent,
/// `AdventureError::Validation` if it is an album, and propagates
/// generator, cover lookup and structural errors.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_request_more_albums(
    command: &RequestMoreAlbums,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<Vec<StructuralId>, AdventureError> {
    expect_kind(adventure, command.direction_id, NodeKind::Direction)?;
    let transcript =
        adventure.transcript_with_request(command.direction_id, MORE_OPTIONS_REQUEST)?;
    expand(adventure, command.direction_id, transcript, command.correlation_id, services).await
}

/// Handles the `ChooseCustomDirection` command: records the typed direction
/// under `album_id` and suggests albums for it. Returns the new direction's
/// id and the suggested albums' ids.
///
/// If the suggestions cannot be fetched the typed direction is removed
/// again, so a failed attempt leaves no trace in the tree.
///
/// # Errors
///
/// Returns `AdventureError::Validation` for a blank label or a non-album
/// target, and propagates generator, cover lookup and structural errors.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_choose_custom_direction(
    command: &ChooseCustomDirection,
    adventure: &mut Adventure,
    services: &AdventureServices<'_>,
) -> Result<(StructuralId, Vec<StructuralId>), AdventureError> {
    let label = command.label.trim();
    if label.is_empty() {
        return Err(AdventureError::Validation("a custom direction cannot be blank".into()));
    }
    expect_kind(adventure, command.album_id, NodeKind::Album)?;
    info!(album = %command.album_id, request = %custom_direction_request(label), "custom direction");

    let direction = Direction {
        selection_index: adventure.next_selection_index(command.album_id)?,
        label: label.to_owned(),
        custom: true,
    };
    let direction_id = adventure.add_child(
        command.album_id,
        NodePayload::Direction(direction),
        command.correlation_id,
        services.clock,
    )?;

    let outcome = match adventure.transcript_at(direction_id) {
        Ok(transcript) => {
            expand(adventure, direction_id, transcript, command.correlation_id, services).await
        }
        Err(error) => Err(error),
    };
    match outcome {
        Ok(album_ids) => Ok((direction_id, album_ids)),
        Err(error) => {
            if let Err(rollback) =
                adventure.prune(direction_id, command.correlation_id, services.clock)
            {
                warn!(direction = %direction_id, %rollback, "could not remove custom direction");
            }
            publish_pending(adventure, services.publisher);
            Err(error)
        }
    }
}

/// Handles the `AddNode` command: inserts a payload by hand.
///
/// # Errors
///
/// Returns `AdventureError::NodeNotFound` if the parent is absent, or
/// `AdventureError::Structural` if the payload breaks alternation or reuses
/// a sibling's selection index.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub fn handle_add_node(
    command: &AddNode,
    adventure: &mut Adventure,
    clock: &dyn Clock,
    publisher: &dyn EventPublisher<AdventureEvent>,
) -> Result<StructuralId, AdventureError> {
    let node_id = adventure.add_child(
        command.parent_id,
        command.payload.clone(),
        command.correlation_id,
        clock,
    )?;
    publish_pending(adventure, publisher);
    info!(parent = %command.parent_id, node = %node_id, "node added");
    Ok(node_id)
}

/// Handles the `PruneNode` command: removes a node and its descendants.
///
/// # Errors
///
/// Returns `AdventureError::Structural` for the origin, or
/// `AdventureError::NodeNotFound` if the node is absent.
#[instrument(
    skip_all,
    fields(
        adventure_id = %adventure.id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id()
    )
)]
pub fn handle_prune_node(
    command: &PruneNode,
    adventure: &mut Adventure,
    clock: &dyn Clock,
    publisher: &dyn EventPublisher<AdventureEvent>,
) -> Result<Vec<StructuralId>, AdventureError> {
    let removed = adventure.prune(command.node_id, command.correlation_id, clock)?;
    publish_pending(adventure, publisher);
    info!(node = %command.node_id, removed = removed.len(), "subtree pruned");
    Ok(removed)
}

fn expect_kind(
    adventure: &Adventure,
    id: StructuralId,
    expected: NodeKind,
) -> Result<(), AdventureError> {
    let actual = adventure.tree().node(id)?.data.kind();
    if actual == expected {
        Ok(())
    } else {
        Err(AdventureError::Validation(format!(
            "node {id} is a {actual}, expected a {expected}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossroads_core::event::DomainEvent;
    use crossroads_core::generation::ChatRole;
    use crossroads_core::metadata::NoCovers;
    use crossroads_test_support::{
        FailingCoverLookup, FailingGenerator, FixedClock, RecordingPublisher, ScriptedGenerator,
        StaticCoverLookup,
    };

    use crate::domain::events::{AdventureEventKind, LoadingChanged};

    const DIRECTIONS: &str = r#"{
        "albumName": "A",
        "artistName": "X",
        "description": "An album.",
        "options": [
            { "index": "a", "direction": "Something that is more acoustic" },
            { "index": "b", "direction": "Something that is more electronic" }
        ]
    }"#;

    const ALBUMS: &str = r#"{
        "albums": [
            { "index": "a", "albumName": "Pink Moon", "artistName": "Nick Drake", "description": "Sparse." },
            { "index": "b", "albumName": "Bryter Layter", "artistName": "Nick Drake", "description": "Lush." }
        ]
    }"#;

    fn adventure() -> Adventure {
        Adventure::create(&FixedClock::standard(), Album::bare("A", "X"), Vec::new())
    }

    fn services<'a>(
        clock: &'a FixedClock,
        generator: &'a dyn TextGenerator,
        covers: &'a dyn CoverLookup,
        publisher: &'a RecordingPublisher<AdventureEvent>,
    ) -> AdventureServices<'a> {
        AdventureServices {
            clock,
            generator,
            covers,
            publisher,
        }
    }

    fn event_types(publisher: &RecordingPublisher<AdventureEvent>) -> Vec<&'static str> {
        publisher.events().iter().map(DomainEvent::event_type).collect()
    }

    fn command_id() -> Uuid {
        Uuid::new_v4()
    }

    #[tokio::test]
    async fn test_populate_first_album_directions_adds_options_in_order() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let command = PopulateFirstAlbumDirections {
            correlation_id: command_id(),
        };

        // Act
        let ids = handle_populate_first_album_directions(&command, &mut adventure, &services)
            .await
            .unwrap();

        // Assert
        assert_eq!(ids, vec![StructuralId::new(2), StructuralId::new(4)]);
        let labels: Vec<String> = adventure
            .tree()
            .children(adventure.tree().origin_id())
            .unwrap()
            .iter()
            .map(|node| node.data.as_direction().unwrap().label.clone())
            .collect();
        assert_eq!(
            labels,
            vec!["Something that is more acoustic", "Something that is more electronic"]
        );
        let transcripts = generator.transcripts();
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0].len(), 2);
        assert_eq!(
            event_types(&publisher),
            vec![
                "adventure.loading_changed",
                "adventure.nodes_added",
                "adventure.loading_changed",
            ]
        );
        assert!(publisher
            .events()
            .iter()
            .all(|event| event.metadata.correlation_id == command.correlation_id));
        assert!(!adventure.is_loading());
    }

    #[tokio::test]
    async fn test_choose_direction_adds_albums_with_covers() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS, ALBUMS]);
        let covers = StaticCoverLookup::new().with_cover(
            "Pink Moon",
            "Nick Drake",
            "https://covers.example/pink-moon.jpg",
        );
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &covers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Act
        let ids = handle_choose_direction(
            &ChooseDirection {
                correlation_id: command_id(),
                album_id: origin,
                selection_index: "b".into(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(ids, vec![StructuralId::new(6), StructuralId::new(8)]);
        let first = adventure.tree().node(ids[0]).unwrap().data.as_album().unwrap();
        assert_eq!(first.cover_url.as_deref(), Some("https://covers.example/pink-moon.jpg"));
        let second = adventure.tree().node(ids[1]).unwrap().data.as_album().unwrap();
        assert_eq!(second.cover_url, None);
        assert_eq!(
            covers.lookups(),
            vec![
                ("Pink Moon".to_owned(), "Nick Drake".to_owned()),
                ("Bryter Layter".to_owned(), "Nick Drake".to_owned()),
            ]
        );
        assert_eq!(adventure.tree().parent_id(ids[0]).unwrap(), Some(StructuralId::new(4)));

        let transcript = &generator.transcripts()[1];
        let roles: Vec<ChatRole> = transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::Assistant, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(transcript[3].content, "b");
    }

    #[tokio::test]
    async fn test_choose_direction_with_unknown_index_adds_nothing() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS, ALBUMS]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();
        let nodes_before = adventure.tree().node_count();
        let events_before = publisher.events().len();

        // Act
        let result = handle_choose_direction(
            &ChooseDirection {
                correlation_id: command_id(),
                album_id: origin,
                selection_index: "q".into(),
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(adventure.tree().node_count(), nodes_before);
        assert_eq!(generator.remaining(), 1);
        assert_eq!(publisher.events().len(), events_before);
    }

    #[tokio::test]
    async fn test_invalid_reply_leaves_tree_unchanged_and_clears_loading() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new(["not json"]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();

        // Act
        let result = handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        assert!(matches!(
            result,
            Err(AdventureError::InvalidGenerationResponse { ref raw, .. }) if raw == "not json"
        ));
        assert_eq!(adventure.tree().node_count(), 1);
        assert_eq!(adventure.tree().edge_count(), 0);
        let kinds: Vec<AdventureEventKind> =
            publisher.events().into_iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AdventureEventKind::LoadingChanged(LoadingChanged { loading: true }),
                AdventureEventKind::LoadingChanged(LoadingChanged { loading: false }),
            ]
        );
        assert!(!adventure.is_loading());
    }

    #[tokio::test]
    async fn test_cover_lookup_failure_leaves_tree_unchanged() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([ALBUMS]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &FailingCoverLookup, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        adventure
            .add_child(
                origin,
                NodePayload::Direction(Direction {
                    selection_index: "a".into(),
                    label: "Something that is more acoustic".into(),
                    custom: false,
                }),
                command_id(),
                &clock,
            )
            .unwrap();
        adventure.take_uncommitted_events();

        // Act
        let result = handle_choose_direction(
            &ChooseDirection {
                correlation_id: command_id(),
                album_id: origin,
                selection_index: "a".into(),
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(AdventureError::CoverLookup(_))));
        assert_eq!(adventure.tree().node_count(), 2);
        assert_eq!(adventure.tree().edge_count(), 1);
        assert_eq!(
            publisher.events().last().map(|event| event.kind.clone()),
            Some(AdventureEventKind::LoadingChanged(LoadingChanged { loading: false }))
        );
    }

    #[tokio::test]
    async fn test_generator_failure_is_propagated() {
        // Arrange
        let clock = FixedClock::standard();
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &FailingGenerator, &NoCovers, &publisher);
        let mut adventure = adventure();

        // Act
        let result = handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(AdventureError::Generation(_))));
        assert_eq!(adventure.tree().node_count(), 1);
    }

    #[tokio::test]
    async fn test_choose_album_offers_directions_under_album() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS, ALBUMS, DIRECTIONS]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();
        handle_choose_direction(
            &ChooseDirection {
                correlation_id: command_id(),
                album_id: origin,
                selection_index: "a".into(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();
        let direction_id = StructuralId::new(2);

        // Act
        let ids = handle_choose_album(
            &ChooseAlbum {
                correlation_id: command_id(),
                direction_id,
                selection_index: "b".into(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(ids.len(), 2);
        let album_id = adventure.find_child(direction_id, "b").unwrap();
        assert_eq!(adventure.tree().parent_id(ids[0]).unwrap(), Some(album_id));
        assert_eq!(adventure.tree().depth(ids[0]).unwrap(), 3);
        let transcript = &generator.transcripts()[2];
        assert_eq!(transcript.len(), 6);
        assert_eq!(transcript[5].content, "b");
    }

    #[tokio::test]
    async fn test_choose_album_rejects_album_parent() {
        let clock = FixedClock::standard();
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &FailingGenerator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();

        let result = handle_choose_album(
            &ChooseAlbum {
                correlation_id: command_id(),
                direction_id: origin,
                selection_index: "a".into(),
            },
            &mut adventure,
            &services,
        )
        .await;

        assert!(matches!(result, Err(AdventureError::Validation(_))));
    }

    #[tokio::test]
    async fn test_request_more_directions_appends_after_existing() {
        // Arrange
        let more = r#"{ "options": [
            { "index": "c", "direction": "Something else that is also dreamy" }
        ] }"#;
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS, more]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Act
        let ids = handle_request_more_directions(
            &RequestMoreDirections {
                correlation_id: command_id(),
                album_id: origin,
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(ids, vec![StructuralId::new(6)]);
        assert_eq!(adventure.tree().child_ids(origin).unwrap().len(), 3);
        let transcript = &generator.transcripts()[1];
        assert_eq!(transcript.last().unwrap().content, MORE_OPTIONS_REQUEST);
        assert_eq!(transcript.last().unwrap().role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_request_more_albums_looks_up_covers() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([ALBUMS]);
        let covers = StaticCoverLookup::new();
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &covers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        let direction_id = adventure
            .add_child(
                origin,
                NodePayload::Direction(Direction {
                    selection_index: "a".into(),
                    label: "Something quieter".into(),
                    custom: false,
                }),
                command_id(),
                &clock,
            )
            .unwrap();

        // Act
        let ids = handle_request_more_albums(
            &RequestMoreAlbums {
                correlation_id: command_id(),
                direction_id,
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(ids.len(), 2);
        assert_eq!(covers.lookups().len(), 2);
        assert_eq!(
            generator.transcripts()[0].last().unwrap().content,
            MORE_OPTIONS_REQUEST
        );
    }

    #[tokio::test]
    async fn test_request_more_directions_rejects_reused_index() {
        // Arrange
        let reused = r#"{ "options": [ { "index": "a", "direction": "three" } ] }"#;
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS, reused]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Act
        let result = handle_request_more_directions(
            &RequestMoreDirections {
                correlation_id: command_id(),
                album_id: origin,
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        match result {
            Err(AdventureError::InvalidGenerationResponse { raw, .. }) => assert_eq!(raw, reused),
            other => panic!("expected InvalidGenerationResponse, got {other:?}"),
        }
        assert_eq!(adventure.tree().child_ids(origin).unwrap().len(), 2);
        assert_eq!(adventure.find_child(origin, "a").unwrap(), StructuralId::new(2));
        assert_eq!(event_types(&publisher).last(), Some(&"adventure.loading_changed"));
    }

    #[tokio::test]
    async fn test_request_more_albums_rejects_repeated_index_before_cover_lookups() {
        // Arrange
        let repeated = r#"{ "albums": [
            { "index": "b", "albumName": "Pink Moon", "artistName": "Nick Drake", "description": "Sparse." },
            { "index": "b", "albumName": "Five Leaves Left", "artistName": "Nick Drake", "description": "Autumnal." }
        ] }"#;
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([repeated]);
        let covers = StaticCoverLookup::new();
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &covers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        let direction_id = adventure
            .add_child(
                origin,
                NodePayload::Direction(Direction {
                    selection_index: "a".into(),
                    label: "Something quieter".into(),
                    custom: false,
                }),
                command_id(),
                &clock,
            )
            .unwrap();

        // Act
        let result = handle_request_more_albums(
            &RequestMoreAlbums {
                correlation_id: command_id(),
                direction_id,
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(AdventureError::InvalidGenerationResponse { .. })));
        assert!(!adventure.tree().has_children(direction_id).unwrap());
        assert!(covers.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_choose_custom_direction_records_typed_label() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new([DIRECTIONS, ALBUMS]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        handle_populate_first_album_directions(
            &PopulateFirstAlbumDirections {
                correlation_id: command_id(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Act
        let (direction_id, album_ids) = handle_choose_custom_direction(
            &ChooseCustomDirection {
                correlation_id: command_id(),
                album_id: origin,
                label: "  more brass  ".into(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Assert
        let direction = adventure.tree().node(direction_id).unwrap().data.as_direction().unwrap();
        assert_eq!(direction.selection_index, "c");
        assert_eq!(direction.label, "more brass");
        assert!(direction.custom);
        assert_eq!(album_ids.len(), 2);
        let transcript = &generator.transcripts()[1];
        assert_eq!(transcript.last().unwrap().content, "custom: more brass");
    }

    #[tokio::test]
    async fn test_choose_custom_direction_failure_removes_typed_direction() {
        // Arrange
        let clock = FixedClock::standard();
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &FailingGenerator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();

        // Act
        let result = handle_choose_custom_direction(
            &ChooseCustomDirection {
                correlation_id: command_id(),
                album_id: origin,
                label: "more brass".into(),
            },
            &mut adventure,
            &services,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(AdventureError::Generation(_))));
        assert_eq!(adventure.tree().node_count(), 1);
        assert_eq!(adventure.tree().edge_count(), 0);
        assert_eq!(event_types(&publisher).last(), Some(&"adventure.node_pruned"));
    }

    #[tokio::test]
    async fn test_choose_custom_direction_rejects_blank_label() {
        let clock = FixedClock::standard();
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &FailingGenerator, &NoCovers, &publisher);
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();

        let result = handle_choose_custom_direction(
            &ChooseCustomDirection {
                correlation_id: command_id(),
                album_id: origin,
                label: "   ".into(),
            },
            &mut adventure,
            &services,
        )
        .await;

        assert!(matches!(result, Err(AdventureError::Validation(_))));
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_set_starting_album_describes_and_covers_origin() {
        // Arrange
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new(["\"A haunting folk record.\""]);
        let covers = StaticCoverLookup::new().with_cover(
            "Pink Moon",
            "Nick Drake",
            "https://covers.example/pink-moon.jpg",
        );
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &covers, &publisher);
        let mut adventure = Adventure::create(&clock, Album::bare("", ""), Vec::new());

        // Act
        handle_set_starting_album(
            &SetStartingAlbum {
                correlation_id: command_id(),
                name: "Pink Moon".into(),
                creator: "Nick Drake".into(),
            },
            &mut adventure,
            &services,
        )
        .await
        .unwrap();

        // Assert
        let album = adventure.starting_album().unwrap();
        assert_eq!(album.selection_index, "0");
        assert_eq!(album.name, "Pink Moon");
        assert_eq!(album.description, "A haunting folk record.");
        assert_eq!(album.cover_url.as_deref(), Some("https://covers.example/pink-moon.jpg"));
        let transcript = &generator.transcripts()[0];
        assert_eq!(transcript.len(), 2);
        assert_eq!(
            transcript[1].content,
            "Provide a one-sentence summary of the album 'Pink Moon' by Nick Drake"
        );
        assert_eq!(
            event_types(&publisher),
            vec![
                "adventure.loading_changed",
                "adventure.starting_album_set",
                "adventure.loading_changed",
            ]
        );
    }

    #[tokio::test]
    async fn test_set_starting_album_rejects_blank_creator() {
        let clock = FixedClock::standard();
        let generator = ScriptedGenerator::new(["unused"]);
        let publisher = RecordingPublisher::new();
        let services = services(&clock, &generator, &NoCovers, &publisher);
        let mut adventure = adventure();

        let result = handle_set_starting_album(
            &SetStartingAlbum {
                correlation_id: command_id(),
                name: "Pink Moon".into(),
                creator: " ".into(),
            },
            &mut adventure,
            &services,
        )
        .await;

        assert!(matches!(result, Err(AdventureError::Validation(_))));
        assert_eq!(generator.remaining(), 1);
    }

    #[test]
    fn test_add_and_prune_node_publish_events() {
        // Arrange
        let clock = FixedClock::standard();
        let publisher = RecordingPublisher::new();
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();
        let add = AddNode {
            correlation_id: command_id(),
            parent_id: origin,
            payload: NodePayload::Direction(Direction {
                selection_index: "a".into(),
                label: "Something slower".into(),
                custom: false,
            }),
        };

        // Act
        let node_id = handle_add_node(&add, &mut adventure, &clock, &publisher).unwrap();
        let removed = handle_prune_node(
            &PruneNode {
                correlation_id: command_id(),
                node_id,
            },
            &mut adventure,
            &clock,
            &publisher,
        )
        .unwrap();

        // Assert
        assert_eq!(node_id, StructuralId::new(2));
        assert_eq!(removed, vec![node_id]);
        assert_eq!(
            event_types(&publisher),
            vec!["adventure.nodes_added", "adventure.node_pruned"]
        );
    }

    #[test]
    fn test_prune_node_refuses_origin() {
        let clock = FixedClock::standard();
        let publisher = RecordingPublisher::new();
        let mut adventure = adventure();
        let origin = adventure.tree().origin_id();

        let result = handle_prune_node(
            &PruneNode {
                correlation_id: command_id(),
                node_id: origin,
            },
            &mut adventure,
            &clock,
            &publisher,
        );

        assert!(matches!(result, Err(AdventureError::Structural(_))));
        assert!(publisher.events().is_empty());
    }
}
