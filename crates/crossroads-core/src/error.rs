//! Domain error types.

use thiserror::Error;

use crate::tree::StructuralId;

/// Top-level error type shared by every Crossroads crate.
#[derive(Debug, Error)]
pub enum AdventureError {
    /// A node id does not exist in the tree.
    #[error("node not found: {0}")]
    NodeNotFound(StructuralId),

    /// No child of `parent` carries the requested selection index.
    #[error("no child of node {parent} has selection index {selection_index:?}")]
    SelectionNotFound {
        /// The node whose children were searched.
        parent: StructuralId,
        /// The selection index that matched nothing.
        selection_index: String,
    },

    /// No stored adventure exists under this id.
    #[error("adventure not found: {0}")]
    AdventureNotFound(String),

    /// An operation would break a tree invariant.
    #[error("structural error: {0}")]
    Structural(String),

    /// The generator replied with text that is not the expected JSON shape.
    #[error("invalid generation response: {reason}")]
    InvalidGenerationResponse {
        /// Why the response was rejected.
        reason: String,
        /// The raw text returned by the generator.
        raw: String,
    },

    /// The generator could not be reached or failed to answer.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The cover lookup collaborator failed.
    #[error("cover lookup failed: {0}")]
    CoverLookup(String),

    /// A validation error in caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl AdventureError {
    /// Returns `true` for every "referenced thing does not exist" variant.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::SelectionNotFound { .. } | Self::AdventureNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants_are_classified() {
        assert!(AdventureError::NodeNotFound(StructuralId::new(3)).is_not_found());
        assert!(
            AdventureError::SelectionNotFound {
                parent: StructuralId::new(0),
                selection_index: "z".into(),
            }
            .is_not_found()
        );
        assert!(AdventureError::AdventureNotFound("17".into()).is_not_found());
        assert!(!AdventureError::Structural("cycle".into()).is_not_found());
    }

    #[test]
    fn test_display_includes_structural_id() {
        let err = AdventureError::NodeNotFound(StructuralId::new(42));
        assert_eq!(err.to_string(), "node not found: 42");
    }
}
