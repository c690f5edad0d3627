//! Relay domain: fragments, the line parser and the relay lifecycle.

mod fragment;
mod parser;
mod phase;

pub use fragment::Fragment;
pub use parser::{
    parse_line, parse_line_stream, parse_lines, ChunkChoice, ChunkDelta, ParsedLine, StreamChunk,
    DATA_PREFIX, DONE_SENTINEL,
};
pub use phase::{RelayPhase, StreamTermination};
