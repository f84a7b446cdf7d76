//! Shared test fakes and utilities for the Crossroads music adventure engine.

mod clock;
mod events;
mod generation;
mod metadata;
mod repository;

pub use clock::FixedClock;
pub use events::RecordingPublisher;
pub use generation::{FailingGenerator, ScriptedGenerator};
pub use metadata::{FailingCoverLookup, StaticCoverLookup};
pub use repository::{FailingBlobStore, InMemoryBlobStore};
