//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay core to external systems:
//! - `ai` - Upstream completion service (OpenAI over HTTP, scripted for tests)
//! - `storage` - Live session table
//! - `websocket` - Chat transport
//! - `http` - REST endpoints and the top-level router

pub mod ai;
pub mod http;
pub mod storage;
pub mod websocket;
