//! Blob store abstraction.
//!
//! Adventures are persisted as whole JSON documents under string keys. The
//! store knows nothing about their shape.

use async_trait::async_trait;

use crate::error::AdventureError;

/// Key-value store for serialized documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the blob stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<String>, AdventureError>;

    /// Stores `blob` under `key`, replacing any previous value.
    async fn set(&self, key: &str, blob: String) -> Result<(), AdventureError>;

    /// Deletes the blob under `key`. Deleting a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), AdventureError>;
}
