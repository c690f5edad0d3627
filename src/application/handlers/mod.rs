//! Application handlers.
//!
//! Command handlers that orchestrate the relay core through its ports.

mod answer_message;
mod connection_lifecycle;
mod relay_message;

pub use answer_message::{AnswerError, AnswerMessageCommand, AnswerMessageHandler};
pub use connection_lifecycle::{ConnectionManager, DisconnectReason, RelayPermit};
pub use relay_message::{
    RelayError, RelayHandlerConfig, RelayMessageCommand, RelayMessageHandler, RelayOutcome,
};
