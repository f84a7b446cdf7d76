//! Test publisher: records published events for assertions.

use std::sync::Mutex;

use crossroads_core::event::EventPublisher;

/// An event publisher that keeps every event it receives.
#[derive(Debug)]
pub struct RecordingPublisher<E> {
    events: Mutex<Vec<E>>,
}

impl<E> Default for RecordingPublisher<E> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Clone> RecordingPublisher<E> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every event published so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<E> {
        self.events.lock().unwrap().clone()
    }
}

impl<E: Clone + Send> EventPublisher<E> for RecordingPublisher<E> {
    fn publish(&self, event: &E) {
        self.events.lock().unwrap().push(event.clone());
    }
}
