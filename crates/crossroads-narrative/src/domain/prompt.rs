//! Fixed prompt text sent to the generator.

use crossroads_core::error::AdventureError;
use serde::Serialize;

use super::nodes::Album;

/// Content of the `system` message opening every transcript.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant";

/// User message asking for further options at the current step.
pub const MORE_OPTIONS_REQUEST: &str = "more options";

const PROTOCOL: &str = r#"I would like you to make a musical choose your own adventure for me, to help me discover new music. Each step of the process should be formatted as JSON in the following format:

{
  "albumName": "Example Album",
  "artistName": "Example Artist",
  "description": "A one-sentence description of the album",
  "options": [
    { "index": "a", "direction": "Something that is more X" },
    { "index": "b", "direction": "Something that is more Y" }
  ]
}

Present two options with the format "something that is more...", and two options with the format "something else that is also...". The first two options should present albums that differ from the source album in the interesting ways. The second two options should be albums that are similar to the source album in interesting ways.
Don't present more than one album by the same artist.

I will respond with the index of the option I chose. If I respond with 'more options', then you should respond with a JSON object containing an array at the key 'options' containing four more options in the same format as above (with indices starting at the next available letter). I may respond with 'custom: [custom direction]'. Once I make a selection, give me four albums that fit the chosen direction in the following format:

{
    "albums": [
        {
            "index": "a",
            "albumName": "Example Album",
            "artistName": "Example Artist",
            "description": "A one-sentence description of the album"
        },
        {
            "index": "b",
            "albumName": "Another Album",
            "artistName": "Another Artist",
            "description": "A one-sentence description of the album"
        }
    ]
}

I will respond with the index of the album option I choose. If I respond with 'more options', then you should respond with a JSON object containing an array at the key 'albums' containing four more albums in the same format as above (with indices starting at the next available letter). The process should then repeat with that album representing the new origin point for the first JSON format.

"#;

const CRITERIA_HEADING: &str = "All album suggestions should meet the following criteria:\n";

const CLOSING: &str = "All your responses should be pure JSON.\n\nLet's start with the following album:\n\n";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartingAlbum<'a> {
    album_name: &'a str,
    artist_name: &'a str,
}

/// Builds the setup message: the adventure protocol, the listener's
/// criteria (omitted entirely when there are none), and the starting album.
///
/// # Errors
///
/// Returns `AdventureError::Infrastructure` if the starting album cannot be
/// rendered as JSON.
pub fn setup_prompt(starting_album: &Album, criteria: &[String]) -> Result<String, AdventureError> {
    let album = serde_json::to_string_pretty(&StartingAlbum {
        album_name: &starting_album.name,
        artist_name: &starting_album.creator,
    })
    .map_err(|e| AdventureError::Infrastructure(format!("starting album rendering failed: {e}")))?;

    let mut prompt = String::from(PROTOCOL);
    if !criteria.is_empty() {
        prompt.push_str(CRITERIA_HEADING);
        for criterion in criteria {
            prompt.push_str("-  ");
            prompt.push_str(criterion);
            prompt.push('\n');
        }
        prompt.push('\n');
    }
    prompt.push_str(CLOSING);
    prompt.push_str(&album);
    prompt.push('\n');
    Ok(prompt)
}

/// Builds the request for a one-sentence description of an album.
#[must_use]
pub fn album_summary_request(name: &str, creator: &str) -> String {
    format!("Provide a one-sentence summary of the album '{name}' by {creator}")
}

/// Builds the user message for a direction the listener typed themselves.
#[must_use]
pub fn custom_direction_request(label: &str) -> String {
    format!("custom: {label}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_prompt_lists_criteria_with_dash_prefix() {
        let album = Album::bare("A", "X");
        let criteria = vec!["released before 1980".to_owned(), "no live albums".to_owned()];

        let prompt = setup_prompt(&album, &criteria).unwrap();

        assert!(prompt.contains(
            "criteria:\n-  released before 1980\n-  no live albums\n\nAll your responses should be pure JSON."
        ));
        assert!(prompt.ends_with("{\n  \"albumName\": \"A\",\n  \"artistName\": \"X\"\n}\n"));
    }

    #[test]
    fn test_setup_prompt_omits_criteria_paragraph_when_empty() {
        let album = Album::bare("A", "X");

        let prompt = setup_prompt(&album, &[]).unwrap();

        assert!(!prompt.contains("criteria"));
        assert!(prompt.contains("first JSON format.\n\nAll your responses should be pure JSON."));
    }

    #[test]
    fn test_setup_prompt_is_stable_across_calls() {
        let album = Album::bare("A", "X");
        let criteria = vec!["instrumental".to_owned()];

        let first = setup_prompt(&album, &criteria).unwrap();
        let second = setup_prompt(&album, &criteria).unwrap();

        assert_eq!(first, second);
    }
}
