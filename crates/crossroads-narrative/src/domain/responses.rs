//! Validation of generator replies.
//!
//! A reply is only trusted once it parses completely. Nothing is added to
//! the tree from a reply that fails here.

use std::collections::HashSet;

use crossroads_core::error::AdventureError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::nodes::{Album, Direction};

/// Parses a reply of the form `{"options": [{"index", "direction"}, ...]}`.
///
/// # Errors
///
/// Returns `AdventureError::InvalidGenerationResponse` carrying `raw` if
/// the reply is not JSON, lacks an `options` array, or holds a malformed
/// entry.
pub fn parse_direction_options(raw: &str) -> Result<Vec<Direction>, AdventureError> {
    let mut directions: Vec<Direction> = parse_array(raw, "options")?;
    for direction in &mut directions {
        direction.custom = false;
    }
    Ok(directions)
}

/// Parses a reply of the form
/// `{"albums": [{"index", "albumName", "artistName", "description"}, ...]}`.
///
/// Any cover URL in the reply is discarded; covers come from the catalogue.
///
/// # Errors
///
/// Returns `AdventureError::InvalidGenerationResponse` carrying `raw` if
/// the reply is not JSON, lacks an `albums` array, or holds a malformed
/// entry.
pub fn parse_album_suggestions(raw: &str) -> Result<Vec<Album>, AdventureError> {
    let mut albums: Vec<Album> = parse_array(raw, "albums")?;
    for album in &mut albums {
        album.cover_url = None;
    }
    Ok(albums)
}

/// Checks that every index the reply offers is new among the parent's
/// children and among the other offered entries.
///
/// # Errors
///
/// Returns `AdventureError::InvalidGenerationResponse` carrying `raw` for
/// the first index that repeats.
pub fn ensure_fresh_indices<'a>(
    raw: &str,
    taken: &[&str],
    offered: impl IntoIterator<Item = &'a str>,
) -> Result<(), AdventureError> {
    let mut seen: HashSet<&str> = taken.iter().copied().collect();
    for index in offered {
        if !seen.insert(index) {
            return Err(AdventureError::InvalidGenerationResponse {
                reason: format!("index `{index}` is already in use"),
                raw: raw.to_owned(),
            });
        }
    }
    Ok(())
}

/// Cleans a free-text album description: trims it and drops the double
/// quotes generators like to wrap it in.
#[must_use]
pub fn clean_description(raw: &str) -> String {
    raw.replace('"', "").trim().to_owned()
}

fn parse_array<T: DeserializeOwned>(raw: &str, key: &str) -> Result<Vec<T>, AdventureError> {
    let invalid = |reason: String| AdventureError::InvalidGenerationResponse {
        reason,
        raw: raw.to_owned(),
    };

    let mut value: Value =
        serde_json::from_str(raw).map_err(|e| invalid(format!("reply is not JSON: {e}")))?;
    let entries = match value.get_mut(key).map(Value::take) {
        Some(entries @ Value::Array(_)) => entries,
        Some(_) => return Err(invalid(format!("`{key}` is not an array"))),
        None => return Err(invalid(format!("reply has no `{key}` key"))),
    };
    serde_json::from_value(entries).map_err(|e| invalid(format!("malformed `{key}` entry: {e}")))
}
