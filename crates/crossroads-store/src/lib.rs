//! Crossroads: storage adapters.
//!
//! Concrete [`BlobStore`](crossroads_core::repository::BlobStore)
//! implementations for persisting adventure documents.

pub mod file_blob_store;
