//! Saving and loading adventures through a [`BlobStore`].
//!
//! Each adventure is one JSON document under `adventure_<id>`. A registry
//! blob under `mapIds` lists every saved id, in save order.

use crossroads_core::clock::Clock;
use crossroads_core::error::AdventureError;
use crossroads_core::repository::BlobStore;
use tracing::{info, warn};

use crate::application::query_handlers::{AdventureSummaryView, summarize};
use crate::domain::aggregates::Adventure;
use crate::domain::document::AdventureDocument;

/// Key of the blob listing every saved adventure id.
pub const REGISTRY_KEY: &str = "mapIds";

/// Returns the key an adventure's document is stored under.
#[must_use]
pub fn document_key(id: &str) -> String {
    format!("adventure_{id}")
}

async fn read_registry(store: &dyn BlobStore) -> Result<Vec<String>, AdventureError> {
    match store.get(REGISTRY_KEY).await? {
        Some(blob) => serde_json::from_str(&blob)
            .map_err(|e| AdventureError::Infrastructure(format!("registry is corrupt: {e}"))),
        None => Ok(Vec::new()),
    }
}

async fn write_registry(store: &dyn BlobStore, ids: &[String]) -> Result<(), AdventureError> {
    let blob = serde_json::to_string(ids)
        .map_err(|e| AdventureError::Infrastructure(format!("registry serialization failed: {e}")))?;
    store.set(REGISTRY_KEY, blob).await
}

fn render(document: &AdventureDocument) -> Result<String, AdventureError> {
    serde_json::to_string(document)
        .map_err(|e| AdventureError::Infrastructure(format!("document serialization failed: {e}")))
}

fn parse(blob: &str) -> Result<AdventureDocument, AdventureError> {
    serde_json::from_str(blob)
        .map_err(|e| AdventureError::Structural(format!("document is malformed: {e}")))
}

/// Writes the adventure's document, then registers its id if it is new.
///
/// # Errors
///
/// Returns `AdventureError::Infrastructure` if the store fails.
pub async fn save_adventure(
    adventure: &Adventure,
    store: &dyn BlobStore,
) -> Result<(), AdventureError> {
    store
        .set(&document_key(&adventure.id), render(&adventure.to_document())?)
        .await?;

    let mut ids = read_registry(store).await?;
    if !ids.contains(&adventure.id) {
        ids.push(adventure.id.clone());
        write_registry(store, &ids).await?;
    }
    info!(adventure_id = %adventure.id, nodes = adventure.tree().node_count(), "adventure saved");
    Ok(())
}

/// Loads the adventure stored under `id`. A document saved without an id
/// takes `id`.
///
/// # Errors
///
/// Returns `AdventureError::AdventureNotFound` if nothing is stored under
/// `id`, `AdventureError::Structural` if the document is malformed, or
/// `AdventureError::Infrastructure` if the store fails.
pub async fn load_adventure(id: &str, store: &dyn BlobStore) -> Result<Adventure, AdventureError> {
    let blob = store
        .get(&document_key(id))
        .await?
        .ok_or_else(|| AdventureError::AdventureNotFound(id.to_owned()))?;
    let mut document = parse(&blob)?;
    if document.id.is_empty() {
        document.id = id.to_owned();
    }
    Adventure::from_document(document)
}

/// Unregisters `id`, then removes its document.
///
/// # Errors
///
/// Returns `AdventureError::Infrastructure` if the store fails.
pub async fn delete_adventure(id: &str, store: &dyn BlobStore) -> Result<(), AdventureError> {
    let mut ids = read_registry(store).await?;
    let before = ids.len();
    ids.retain(|existing| existing != id);
    if ids.len() != before {
        write_registry(store, &ids).await?;
    }
    store.remove(&document_key(id)).await?;
    info!(adventure_id = %id, "adventure deleted");
    Ok(())
}

/// Returns every registered adventure id, in save order.
///
/// # Errors
///
/// Returns `AdventureError::Infrastructure` if the store fails or the
/// registry is corrupt.
pub async fn list_adventure_ids(store: &dyn BlobStore) -> Result<Vec<String>, AdventureError> {
    read_registry(store).await
}

/// Summarizes every registered adventure. Ids whose document is missing
/// are skipped.
///
/// # Errors
///
/// Propagates store failures and malformed documents.
pub async fn list_adventure_summaries(
    store: &dyn BlobStore,
) -> Result<Vec<AdventureSummaryView>, AdventureError> {
    let mut summaries = Vec::new();
    for id in read_registry(store).await? {
        match load_adventure(&id, store).await {
            Ok(adventure) => summaries.push(summarize(&adventure)?),
            Err(AdventureError::AdventureNotFound(_)) => {
                warn!(adventure_id = %id, "registered adventure has no document, skipping");
            }
            Err(error) => return Err(error),
        }
    }
    Ok(summaries)
}

/// Returns the stored document for `id` as JSON text.
///
/// # Errors
///
/// Same as [`load_adventure`].
pub async fn export_adventure(id: &str, store: &dyn BlobStore) -> Result<String, AdventureError> {
    let adventure = load_adventure(id, store).await?;
    serde_json::to_string_pretty(&adventure.to_document())
        .map_err(|e| AdventureError::Infrastructure(format!("document serialization failed: {e}")))
}

/// Saves an exported document as a new adventure with a fresh id, and
/// returns it.
///
/// # Errors
///
/// Returns `AdventureError::Structural` if `json` is not a valid adventure
/// document, or `AdventureError::Infrastructure` if the store fails.
pub async fn import_adventure(
    json: &str,
    clock: &dyn Clock,
    store: &dyn BlobStore,
) -> Result<Adventure, AdventureError> {
    let mut document = parse(json)?;
    document.id = clock.adventure_id();
    let adventure = Adventure::from_document(document)?;
    save_adventure(&adventure, store).await?;
    Ok(adventure)
}
