//! WebSocket transport for the chat relay.
//!
//! Each socket is one connection: it owns one session, runs at most one relay
//! at a time, and receives relay events through its own queue.

mod handler;
mod messages;

pub use handler::{chat_ws_handler, websocket_router, ChatSocketState};
pub use messages::{validate_content, ClientMessage, ServerMessage, INVALID_MESSAGE};
