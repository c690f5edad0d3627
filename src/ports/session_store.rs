//! Session Store Port - Interface for per-connection conversation state.
//!
//! The store is the single process-wide table of live sessions. Every
//! operation is keyed by [`ConnectionId`]; implementations must serialize
//! mutations on the same key without blocking other keys.

use async_trait::async_trait;

use crate::domain::conversation::{Session, SessionError};
use crate::domain::foundation::ConnectionId;

/// Port for the live session table.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session whose history holds only the system turn.
    ///
    /// # Errors
    ///
    /// - `DuplicateSession` if the connection already has a session
    async fn create(&self, connection_id: ConnectionId) -> Result<Session, SessionError>;

    /// Returns a snapshot of the session.
    ///
    /// # Errors
    ///
    /// - `UnknownSession` if no session exists
    async fn get(&self, connection_id: ConnectionId) -> Result<Session, SessionError>;

    /// Appends a user turn in place and returns the updated session snapshot.
    ///
    /// # Errors
    ///
    /// - `UnknownSession` if no session exists
    /// - `InvalidTurn` if the text is blank
    async fn append_user_turn(
        &self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Result<Session, SessionError>;

    /// Appends an assistant turn in place.
    ///
    /// # Errors
    ///
    /// - `UnknownSession` if no session exists
    /// - `InvalidTurn` if the text is empty
    async fn append_assistant_turn(
        &self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Result<(), SessionError>;

    /// Removes the session. Removing an absent session is a no-op.
    async fn destroy(&self, connection_id: ConnectionId);

    /// Number of live sessions.
    async fn len(&self) -> usize;
}
