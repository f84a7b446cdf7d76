//! Command abstractions.

use uuid::Uuid;

/// A request to mutate one adventure.
///
/// Handlers log `command_type` and `correlation_id` on entry, and stamp the
/// correlation id onto every event the command produces.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs, e.g. `"adventure.choose_direction"`.
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}

/// Returns a fresh correlation id for a command issued outside any
/// existing trace.
#[must_use]
pub fn new_correlation_id() -> Uuid {
    Uuid::new_v4()
}
