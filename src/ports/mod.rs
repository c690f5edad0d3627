//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the outside world. Adapters implement these ports.
//!
//! - `SessionStore` - Live per-connection conversation state
//! - `UpstreamClient` - Streaming completion service
//! - `CompletionProvider` - One-shot completion service
//! - `CallerChannel` - Send-only event queue back to a connection

mod caller_channel;
mod completion_provider;
mod session_store;
mod upstream_client;

pub use caller_channel::{CallerChannel, CallerEvent};
pub use completion_provider::{CompletionError, CompletionProvider};
pub use session_store::SessionStore;
pub use upstream_client::{LineStream, UpstreamClient, UpstreamError, UpstreamRequest};
