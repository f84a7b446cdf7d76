//! Record-metadata lookup abstraction.

use async_trait::async_trait;

use crate::error::AdventureError;

/// Best-effort lookup of cover art for a record.
#[async_trait]
pub trait CoverLookup: Send + Sync {
    /// Returns a cover image URL for `name` by `creator`, or `None` when the
    /// catalogue has nothing. `None` is an ordinary outcome, not a failure.
    async fn lookup_cover(
        &self,
        name: &str,
        creator: &str,
    ) -> Result<Option<String>, AdventureError>;
}

/// Lookup that never finds a cover. For offline use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCovers;

#[async_trait]
impl CoverLookup for NoCovers {
    async fn lookup_cover(
        &self,
        _name: &str,
        _creator: &str,
    ) -> Result<Option<String>, AdventureError> {
        Ok(None)
    }
}
