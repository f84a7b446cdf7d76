//! Crossroads Core: shared abstractions and the tree engine.
//!
//! This crate defines the error type, the generic branching [`tree`], and
//! the traits every collaborator implements (text generation, cover lookup,
//! blob storage, clock, event publishing). It contains no domain rules and
//! no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod generation;
pub mod metadata;
pub mod repository;
pub mod tree;
