//! In-Memory Session Store Adapter
//!
//! Keeps live sessions in a process-local table. The outer map lock is held
//! only long enough to find or insert an entry; each session carries its own
//! mutex, so appends on one connection never wait on another connection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::conversation::{Session, SessionError};
use crate::domain::foundation::ConnectionId;
use crate::ports::SessionStore;

type SessionSlot = Arc<Mutex<Session>>;

/// In-memory table of live sessions
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    system_prompt: Arc<str>,
    sessions: Arc<RwLock<HashMap<ConnectionId, SessionSlot>>>,
}

impl InMemorySessionStore {
    /// Create a store whose sessions open with the given system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Arc::from(system_prompt.into()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn slot(&self, connection_id: ConnectionId) -> Result<SessionSlot, SessionError> {
        self.sessions
            .read()
            .await
            .get(&connection_id)
            .cloned()
            .ok_or(SessionError::UnknownSession(connection_id))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, connection_id: ConnectionId) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&connection_id) {
            return Err(SessionError::DuplicateSession(connection_id));
        }

        let session = Session::open(connection_id, self.system_prompt.as_ref());
        sessions.insert(connection_id, Arc::new(Mutex::new(session.clone())));
        Ok(session)
    }

    async fn get(&self, connection_id: ConnectionId) -> Result<Session, SessionError> {
        let slot = self.slot(connection_id).await?;
        let session = slot.lock().await;
        Ok(session.clone())
    }

    async fn append_user_turn(
        &self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Result<Session, SessionError> {
        let slot = self.slot(connection_id).await?;
        let mut session = slot.lock().await;
        session.history_mut().append_user(text)?;
        Ok(session.clone())
    }

    async fn append_assistant_turn(
        &self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Result<(), SessionError> {
        let slot = self.slot(connection_id).await?;
        let mut session = slot.lock().await;
        session.history_mut().append_assistant(text)?;
        Ok(())
    }

    async fn destroy(&self, connection_id: ConnectionId) {
        self.sessions.write().await.remove(&connection_id);
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
