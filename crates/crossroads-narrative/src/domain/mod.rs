//! Domain layer: node payloads, the adventure aggregate, replay, and the
//! commands and events that drive it.

pub mod aggregates;
pub mod commands;
pub mod document;
pub mod events;
pub mod nodes;
pub mod prompt;
pub mod replay;
pub mod responses;
