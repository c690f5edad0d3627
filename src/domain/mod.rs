//! Domain layer containing relay business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (identifiers, timestamps, errors, state machines)
//! - `conversation` - Sessions and their append-only turn history
//! - `relay` - Streamed fragments, the protocol line parser and the relay lifecycle

pub mod conversation;
pub mod foundation;
pub mod relay;
