//! Session store errors.
//!
//! Both variants signal lifecycle wiring bugs rather than runtime
//! conditions: a correct transport creates a session exactly once per
//! connection and never touches it after disconnect.

use thiserror::Error;

use crate::domain::foundation::{ConnectionId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session already exists for connection {0}")]
    DuplicateSession(ConnectionId),

    #[error("No session for connection {0}")]
    UnknownSession(ConnectionId),

    #[error("Invalid turn: {0}")]
    InvalidTurn(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_connection_id() {
        let id = ConnectionId::new();
        let err = SessionError::UnknownSession(id);
        assert_eq!(err.to_string(), format!("No session for connection {}", id));
    }
}
