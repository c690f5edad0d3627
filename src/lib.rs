//! Chat Relay - Real-time conversational relay for streamed LLM answers
//!
//! Each WebSocket connection owns a conversation history. User messages are
//! echoed, forwarded with the full history to an OpenAI-style streaming
//! completion endpoint, and the answer is relayed back fragment by fragment
//! before being recorded as the assistant's turn.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
