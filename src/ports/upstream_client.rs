//! Upstream Client Port - Interface for the streaming completion service.
//!
//! An implementation opens one streaming request per relay and hands back the
//! raw response lines. Parsing lines into fragments is done by the domain
//! parser, not by the client.
//!
//! # Cancellation
//!
//! The token passed to [`UpstreamClient::stream`] is observed both while the
//! handshake is pending and between line reads. Once it fires the line stream
//! ends and the underlying connection is dropped.

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::domain::conversation::{ConversationHistory, Turn};

/// Raw response lines. Each item is one line without its terminator.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Port for the streaming completion service.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issues the request with streaming enabled and returns the line stream.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the connection or handshake fails, or the service
    ///   answers with a non-success status
    /// - `Cancelled` if the token fires before the handshake completes
    async fn stream(
        &self,
        request: UpstreamRequest,
        cancel: CancellationToken,
    ) -> Result<LineStream, UpstreamError>;
}

/// Request body for a streamed completion.
///
/// Built fresh from a history snapshot for every relay and never mutated
/// after it is issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub stream: bool,
    pub temperature: f32,
}

impl UpstreamRequest {
    /// Builds a streaming request carrying every turn of the history.
    pub fn from_history(
        model: impl Into<String>,
        history: &ConversationHistory,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: history.turns().to_vec(),
            stream: true,
            temperature,
        }
    }
}

/// Upstream failures, as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Connection or handshake failed; nothing was streamed.
    #[error("Upstream unavailable: {message}")]
    Unavailable { message: String },

    /// The stream broke after it was opened.
    #[error("Upstream stream interrupted: {0}")]
    Interrupted(String),

    /// The relay was cancelled.
    #[error("Upstream request cancelled")]
    Cancelled,
}

impl UpstreamError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted(message.into())
    }

    /// Stable wire code shown to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "upstream_unavailable",
            Self::Interrupted(_) => "upstream_interrupted",
            Self::Cancelled => "cancelled",
        }
    }
}
