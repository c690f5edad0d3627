//! WebSocket upgrade handler for chat connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Issue a connection id and open its session
//! 2. Send the `Connected` frame
//! 3. Relay inbound messages, each in its own task
//! 4. Drain relay events to the socket from a single writer task
//! 5. Disconnect (cancel in-flight relays, destroy the session)

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::handlers::{
    ConnectionManager, DisconnectReason, RelayError, RelayMessageCommand, RelayMessageHandler,
};
use crate::domain::foundation::ConnectionId;
use crate::ports::{CallerChannel, CallerEvent};

use super::messages::{validate_content, ClientMessage, ServerMessage, INVALID_MESSAGE};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct ChatSocketState {
    pub connections: ConnectionManager,
    pub relay: Arc<RelayMessageHandler>,
    pub max_message_length: usize,
}

impl ChatSocketState {
    pub fn new(
        connections: ConnectionManager,
        relay: Arc<RelayMessageHandler>,
        max_message_length: usize,
    ) -> Self {
        Self {
            connections,
            relay,
            max_message_length,
        }
    }
}

/// Handle WebSocket upgrade requests for chat.
///
/// Route: `GET /ws/chat`
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ChatSocketState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection context used by the reader side.
struct SocketSession {
    connection_id: ConnectionId,
    caller: CallerChannel,
    control: mpsc::UnboundedSender<ServerMessage>,
    state: ChatSocketState,
}

impl SocketSession {
    /// Handles one inbound text frame.
    async fn on_text(&self, text: &str) {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    error = %e,
                    "Unparseable client frame"
                );
                self.caller
                    .send(CallerEvent::error(INVALID_MESSAGE, format!("Unrecognised frame: {}", e)));
                return;
            }
        };

        match message {
            ClientMessage::Ping => {
                let _ = self.control.send(ServerMessage::pong());
            }
            ClientMessage::SendMessage { content } => self.on_send_message(content).await,
        }
    }

    async fn on_send_message(&self, content: String) {
        if let Err(e) = validate_content(&content, self.state.max_message_length) {
            self.caller
                .send(CallerEvent::error(INVALID_MESSAGE, e.to_string()));
            return;
        }

        let permit = match self.state.connections.begin_relay(self.connection_id).await {
            Ok(permit) => permit,
            Err(e @ RelayError::SessionBusy(_)) => {
                tracing::debug!(connection_id = %self.connection_id, "Message rejected while streaming");
                self.caller.send(CallerEvent::UserEcho { text: content });
                self.caller.send(CallerEvent::error(e.code(), e.to_string()));
                return;
            }
            Err(e) => {
                tracing::error!(connection_id = %self.connection_id, error = %e, "Cannot start relay");
                self.caller
                    .send(CallerEvent::error(e.code(), "Internal error"));
                return;
            }
        };

        let relay = self.state.relay.clone();
        let caller = self.caller.clone();
        let connection_id = self.connection_id;

        tokio::spawn(async move {
            let cancel = permit.cancel_token();
            let cmd = RelayMessageCommand::new(connection_id, content);

            match relay.handle(cmd, &caller, cancel.clone()).await {
                Ok(outcome) => tracing::debug!(
                    %connection_id,
                    phase = ?outcome.phase,
                    fragments = outcome.fragment_count,
                    "Relay finished"
                ),
                Err(e) if cancel.is_cancelled() => {
                    tracing::debug!(%connection_id, error = %e, "Relay ended after disconnect")
                }
                Err(e) => {
                    tracing::error!(%connection_id, error = %e, "Session store misuse during relay");
                    caller.send(CallerEvent::error(e.code(), "Internal error"));
                }
            }

            drop(permit);
        });
    }
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: ChatSocketState) {
    let connection_id = ConnectionId::new();

    let cancel = match state.connections.connect(connection_id).await {
        Ok(cancel) => cancel,
        Err(e) => {
            tracing::error!(%connection_id, error = %e, "Failed to open session");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    if let Err(e) = send_message(&mut sender, &ServerMessage::connected(connection_id)).await {
        tracing::debug!(%connection_id, "Failed to send connected message: {}", e);
        state
            .connections
            .disconnect(connection_id, DisconnectReason::TransportError(e.to_string()))
            .await;
        return;
    }

    let (caller, mut events) = CallerChannel::new(connection_id);
    let (control, mut control_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Single writer: relay events and control frames, in arrival order
    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(event) = events.recv() => ServerMessage::from(event),
                Some(message) = control_rx.recv() => message,
                else => break,
            };
            if let Err(e) = send_message(&mut sender, &message).await {
                tracing::debug!(%connection_id, "Send error, closing connection: {}", e);
                break;
            }
        }
    });

    let session = SocketSession {
        connection_id,
        caller,
        control,
        state: state.clone(),
    };

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => session.on_text(&text).await,
                Ok(Message::Binary(_)) => {
                    session
                        .caller
                        .send(CallerEvent::error(INVALID_MESSAGE, "Binary frames are not supported"));
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level heartbeats are answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(%connection_id, "Client sent close frame");
                    return DisconnectReason::ClientClosed;
                }
                Err(e) => {
                    tracing::debug!(%connection_id, "Receive error: {}", e);
                    return DisconnectReason::TransportError(e.to_string());
                }
            }
        }
        DisconnectReason::ClientClosed
    });

    let reason = tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            DisconnectReason::TransportError("send failed".to_string())
        }
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or_else(|e| DisconnectReason::TransportError(e.to_string()))
        }
        _ = cancel.cancelled() => {
            recv_task.abort();
            send_task.abort();
            DisconnectReason::Shutdown
        }
    };

    state.connections.disconnect(connection_id, reason).await;
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the chat WebSocket endpoint.
pub fn websocket_router(state: ChatSocketState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/ws/chat", get(chat_ws_handler))
        .with_state(state)
}
