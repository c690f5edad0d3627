//! AnswerMessageHandler - Drafts a single non-streamed reply to a message.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::conversation::Turn;
use crate::domain::foundation::ValidationError;
use crate::ports::{CompletionError, CompletionProvider};

/// Command to draft a reply.
#[derive(Debug, Clone)]
pub struct AnswerMessageCommand {
    pub message: String,
}

impl AnswerMessageCommand {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::empty_field("message"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error(transparent)]
    InvalidMessage(#[from] ValidationError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Handler for one-shot replies.
pub struct AnswerMessageHandler {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: String,
    temperature: f32,
}

impl AnswerMessageHandler {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        system_prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            temperature,
        }
    }

    pub async fn handle(&self, cmd: AnswerMessageCommand) -> Result<String, AnswerError> {
        cmd.validate()?;

        let messages = vec![
            Turn::system(self.system_prompt.as_str()),
            Turn::user(cmd.message),
        ];
        let answer = self.provider.complete(messages, self.temperature).await?;

        tracing::debug!(chars = answer.len(), "Drafted answer");
        Ok(answer)
    }
}
