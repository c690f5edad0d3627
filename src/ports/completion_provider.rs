//! Completion Provider Port - One-shot, non-streamed completions.
//!
//! Used for drafting a single reply outside a live conversation.

use async_trait::async_trait;

use crate::domain::conversation::Turn;

/// Port for single request/response completions.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends the messages and returns the first choice's content.
    async fn complete(&self, messages: Vec<Turn>, temperature: f32)
        -> Result<String, CompletionError>;
}

/// One-shot completion failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion service unavailable: {0}")]
    Unavailable(String),

    #[error("Completion response could not be read: {0}")]
    InvalidResponse(String),

    #[error("Completion response contained no answer")]
    EmptyAnswer,
}

impl CompletionError {
    /// Stable wire code shown to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "upstream_unavailable",
            Self::InvalidResponse(_) => "upstream_invalid_response",
            Self::EmptyAnswer => "upstream_empty_answer",
        }
    }
}
