//! WebSocket message types for the chat relay.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, echo, tokens, completion, errors, pongs
//! - Client → Server: chat messages, pings
//!
//! Frames are JSON objects tagged by `type`. The relay event names
//! (`ReceiveUserEcho`, `ReceiveToken`, `CompleteMessage`) are part of the
//! client contract and must not change.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConnectionId, Timestamp, ValidationError};
use crate::ports::CallerEvent;

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Connection established; carries the server-issued id.
    Connected {
        connection_id: String,
        timestamp: String,
    },

    /// The user's own message, echoed before streaming starts.
    ReceiveUserEcho { text: String },

    /// One streamed fragment of the answer.
    ReceiveToken { text: String },

    /// The complete answer.
    CompleteMessage { full_text: String },

    /// A failure in place of a completion.
    ReceiveError { code: String, message: String },

    /// Heartbeat response.
    Pong { timestamp: String },
}

impl ServerMessage {
    pub fn connected(connection_id: ConnectionId) -> Self {
        Self::Connected {
            connection_id: connection_id.to_string(),
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }

    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }
}

impl From<CallerEvent> for ServerMessage {
    fn from(event: CallerEvent) -> Self {
        match event {
            CallerEvent::UserEcho { text } => Self::ReceiveUserEcho { text },
            CallerEvent::Token { text } => Self::ReceiveToken { text },
            CallerEvent::Complete { full_text } => Self::CompleteMessage { full_text },
            CallerEvent::Error { code, message } => Self::ReceiveError { code, message },
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// A user utterance to relay.
    SendMessage { content: String },

    /// Heartbeat request.
    Ping,
}

/// Wire code for rejected inbound frames.
pub const INVALID_MESSAGE: &str = "invalid_message";

/// Checks an inbound utterance before it reaches the relay.
pub fn validate_content(content: &str, max_length: usize) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::empty_field("content"));
    }
    let length = content.chars().count();
    if length > max_length {
        return Err(ValidationError::too_long("content", max_length, length));
    }
    Ok(())
}
