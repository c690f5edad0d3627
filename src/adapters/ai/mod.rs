//! Upstream Adapters.
//!
//! Implementations of the upstream completion ports.
//!
//! ## Available Adapters
//!
//! - `OpenAIUpstream` - OpenAI chat completions over HTTP (streamed and one-shot)
//! - `ScriptedUpstream` - Replays queued scripts for testing

mod openai_upstream;
mod scripted_upstream;

pub use openai_upstream::{OpenAIConfig, OpenAIUpstream};
pub use scripted_upstream::{Script, ScriptStep, ScriptedUpstream};
