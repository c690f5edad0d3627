//! Conversation domain module.
//!
//! Turns, the append-only history they form, and the per-connection
//! session that owns that history.

mod errors;
mod history;
mod session;
mod turn;

pub use errors::SessionError;
pub use history::ConversationHistory;
pub use session::Session;
pub use turn::{Role, Turn};
