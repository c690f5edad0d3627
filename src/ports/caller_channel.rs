//! Caller Channel - Send-only path from the relay back to one connection.
//!
//! Each live connection owns one unbounded queue. The relay pushes
//! [`CallerEvent`]s into it without waiting; the transport drains it in order.
//! Sending to a connection that has already gone away is not an error.

use tokio::sync::mpsc;

use crate::domain::foundation::ConnectionId;

/// Events delivered to the originating connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerEvent {
    /// The user's own message, sent before any upstream I/O.
    UserEcho { text: String },
    /// One forwarded fragment.
    Token { text: String },
    /// The full accumulated answer.
    Complete { full_text: String },
    /// A failure that replaced the completion signal.
    Error { code: String, message: String },
}

impl CallerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Sender half of a connection's event queue.
#[derive(Debug, Clone)]
pub struct CallerChannel {
    connection_id: ConnectionId,
    sender: mpsc::UnboundedSender<CallerEvent>,
}

impl CallerChannel {
    /// Creates the channel and the receiver the transport drains.
    pub fn new(connection_id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<CallerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                connection_id,
                sender,
            },
            receiver,
        )
    }

    /// Fire-and-forget delivery.
    pub fn send(&self, event: CallerEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!(
                connection_id = %self.connection_id,
                "Caller gone, dropping event"
            );
        }
    }
}
