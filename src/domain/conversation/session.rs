//! Session entity: the conversation state owned by one live connection.

use super::history::ConversationHistory;
use crate::domain::foundation::ConnectionId;

/// Per-connection conversation state.
///
/// Created when a connection opens and dropped when it closes. The history
/// is owned exclusively by the session; callers receive clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    connection_id: ConnectionId,
    history: ConversationHistory,
}

impl Session {
    /// Opens a session whose history starts with the system prompt.
    pub fn open(connection_id: ConnectionId, system_prompt: impl Into<String>) -> Self {
        Self {
            connection_id,
            history: ConversationHistory::new(system_prompt),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }
}
