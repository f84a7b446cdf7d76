//! Application layer: command handlers that grow an adventure, read-only
//! queries, and persistence of whole adventures.

pub mod command_handlers;
pub mod lifecycle;
pub mod query_handlers;
