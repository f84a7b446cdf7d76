//! Test generators: scripted `TextGenerator` implementations for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use crossroads_core::error::AdventureError;
use crossroads_core::generation::{ChatMessage, TextGenerator};

/// A generator that replays canned replies in order and records every
/// transcript it was sent. Once the script runs out, each call fails with
/// `AdventureError::Generation`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedGenerator {
    /// Create a generator that answers with `replies`, one per call.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of every transcript received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.transcripts.lock().unwrap().clone()
    }

    /// Returns how many scripted replies have not been consumed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, transcript: &[ChatMessage]) -> Result<String, AdventureError> {
        self.transcripts.lock().unwrap().push(transcript.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AdventureError::Generation("script exhausted".into()))
    }
}

/// A generator whose transport always fails. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _transcript: &[ChatMessage]) -> Result<String, AdventureError> {
        Err(AdventureError::Generation("connection refused".into()))
    }
}
