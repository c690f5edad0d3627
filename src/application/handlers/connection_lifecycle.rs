//! Connection lifecycle manager.
//!
//! Binds each transport connection to its session and to a cancellation
//! token. Disconnecting cancels whatever relay is still streaming for that
//! connection before its session is destroyed.
//!
//! At most one relay runs per connection. A message that arrives while the
//! previous answer is still streaming is rejected with `SessionBusy` and does
//! not touch the history.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::relay_message::RelayError;
use crate::domain::conversation::SessionError;
use crate::domain::foundation::ConnectionId;
use crate::ports::SessionStore;

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client closed the socket.
    ClientClosed,
    /// The transport failed.
    TransportError(String),
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientClosed => write!(f, "client closed"),
            DisconnectReason::TransportError(e) => write!(f, "transport error: {}", e),
            DisconnectReason::Shutdown => write!(f, "server shutdown"),
        }
    }
}

#[derive(Debug)]
struct ConnectionEntry {
    cancel: CancellationToken,
    relaying: Arc<AtomicBool>,
}

/// Exclusive right to run one relay on a connection.
///
/// Dropping the permit frees the connection for the next message.
#[derive(Debug)]
pub struct RelayPermit {
    connection_id: ConnectionId,
    cancel: CancellationToken,
    relaying: Arc<AtomicBool>,
}

impl RelayPermit {
    /// Token that fires when the connection goes away.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for RelayPermit {
    fn drop(&mut self) {
        self.relaying.store(false, Ordering::Release);
        tracing::trace!(connection_id = %self.connection_id, "Relay permit released");
    }
}

/// Tracks live connections and their sessions.
#[derive(Clone)]
pub struct ConnectionManager {
    store: Arc<dyn SessionStore>,
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionEntry>>>,
}

impl ConnectionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Opens the session for a new connection.
    ///
    /// Returns the connection's cancellation token, which fires on
    /// disconnect or shutdown.
    ///
    /// # Errors
    ///
    /// - `DuplicateSession` if the id is already live
    pub async fn connect(&self, connection_id: ConnectionId) -> Result<CancellationToken, RelayError> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&connection_id) {
            return Err(SessionError::DuplicateSession(connection_id).into());
        }

        self.store.create(connection_id).await?;

        let cancel = CancellationToken::new();
        connections.insert(
            connection_id,
            ConnectionEntry {
                cancel: cancel.clone(),
                relaying: Arc::new(AtomicBool::new(false)),
            },
        );

        tracing::info!(%connection_id, live = connections.len(), "Connection opened");
        Ok(cancel)
    }

    /// Cancels any in-flight relay and destroys the session. Idempotent.
    pub async fn disconnect(&self, connection_id: ConnectionId, reason: DisconnectReason) {
        let removed = self.connections.write().await.remove(&connection_id);

        let Some(entry) = removed else {
            tracing::debug!(%connection_id, %reason, "Disconnect for unknown connection ignored");
            return;
        };

        let was_relaying = entry.relaying.load(Ordering::Acquire);
        entry.cancel.cancel();
        self.store.destroy(connection_id).await;

        tracing::info!(%connection_id, %reason, was_relaying, "Connection closed");
    }

    /// Claims the connection for one relay.
    ///
    /// # Errors
    ///
    /// - `SessionBusy` if a relay is already running
    /// - `UnknownSession` if the connection is not live
    pub async fn begin_relay(&self, connection_id: ConnectionId) -> Result<RelayPermit, RelayError> {
        let connections = self.connections.read().await;
        let entry = connections
            .get(&connection_id)
            .ok_or(SessionError::UnknownSession(connection_id))?;

        if entry
            .relaying
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RelayError::SessionBusy(connection_id));
        }

        Ok(RelayPermit {
            connection_id,
            cancel: entry.cancel.child_token(),
            relaying: entry.relaying.clone(),
        })
    }

    /// Number of registered connections.
    pub async fn live_connections(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Disconnects every live connection.
    pub async fn disconnect_all(&self, reason: DisconnectReason) {
        let ids: Vec<ConnectionId> = self.connections.read().await.keys().copied().collect();
        for id in ids {
            self.disconnect(id, reason.clone()).await;
        }
    }
}
