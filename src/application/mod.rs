//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    AnswerError, AnswerMessageCommand, AnswerMessageHandler, ConnectionManager,
    DisconnectReason, RelayError, RelayHandlerConfig, RelayMessageCommand, RelayMessageHandler,
    RelayOutcome, RelayPermit,
};
