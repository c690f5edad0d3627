//! Storage Adapters
//!
//! Implementations of the SessionStore port.
//!
//! ## Available Adapters
//!
//! - **InMemorySessionStore** - Process-local table of live sessions

mod in_memory_session_store;

pub use in_memory_session_store::InMemorySessionStore;
