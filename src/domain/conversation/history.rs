//! Conversation history for a single connection.
//!
//! # Invariants
//!
//! - The first turn is always the system turn, inserted at construction.
//! - No other system turn is ever added.
//! - The sequence is append-only. Only user and assistant turns are appended.
//! - Assistant turns are never empty.

use serde::Serialize;

use super::turn::{Role, Turn};
use crate::domain::foundation::ValidationError;

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Starts a history with the given system prompt as its first turn.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
        }
    }

    /// Appends the user's utterance.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the content is blank
    pub fn append_user(&mut self, content: impl Into<String>) -> Result<(), ValidationError> {
        self.append(Role::User, content.into())
    }

    /// Appends the assistant's accumulated answer.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the content is empty; an unanswered user turn is
    ///   recorded by appending nothing
    pub fn append_assistant(&mut self, content: impl Into<String>) -> Result<(), ValidationError> {
        self.append(Role::Assistant, content.into())
    }

    fn append(&mut self, role: Role, content: String) -> Result<(), ValidationError> {
        let blank = match role {
            Role::Assistant => content.is_empty(),
            _ => content.trim().is_empty(),
        };
        if blank {
            return Err(ValidationError::empty_field(format!("{}_turn", role)));
        }
        self.turns.push(Turn::new(role, content));
        Ok(())
    }

    /// All turns in order, system turn first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false once constructed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
