//! Language-generation stage.

use crate::pipeline::stage::{Stage, StageError};
use crate::services::{ChatTurn, ResponseGenerator};
use std::sync::Arc;

/// Stage that turns caller transcripts into agent replies.
///
/// Keeps the conversation history for the lifetime of the call run so the
/// generator sees the full exchange on every turn.
pub struct LlmStage {
    generator: Arc<dyn ResponseGenerator>,
    history: Vec<ChatTurn>,
}

impl LlmStage {
    /// Creates an LLM stage over the given generator.
    pub fn new(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            generator,
            history: Vec::new(),
        }
    }

    /// Number of turns exchanged so far.
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }
}

impl Stage for LlmStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &'static str {
        "llm"
    }

    fn process(&mut self, prompt: String) -> Result<Vec<String>, StageError> {
        self.history.push(ChatTurn::user(prompt));

        let reply = match self.generator.generate(&self.history) {
            Ok(reply) => reply,
            Err(e) => {
                // Keep the history balanced; the dropped prompt will be
                // re-spoken by the caller if it mattered.
                self.history.pop();
                return Err(StageError::Recoverable(e.to_string()));
            }
        };

        if reply.is_empty() {
            self.history.pop();
            return Ok(Vec::new());
        }

        self.history.push(ChatTurn::assistant(reply.clone()));
        tracing::info!(text = %reply, "agent replies");
        Ok(vec![reply])
    }
}
