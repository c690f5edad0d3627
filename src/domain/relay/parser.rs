//! Fragment parser for the upstream server-sent-event stream.
//!
//! Turns raw protocol lines into [`Fragment`]s. The parser performs no I/O:
//! it is offered both over a plain iterator and over an async stream of
//! lines, and in both forms it stops pulling input as soon as the `[DONE]`
//! sentinel is seen.
//!
//! Per line:
//! - blank lines and lines without the `data:` prefix are skipped
//! - `data: [DONE]` ends the sequence with a final marker fragment
//! - any other payload is decoded as a chunk; undecodable chunks are dropped
//!   and the sequence continues
//! - a chunk yields a fragment only when its first choice carries a
//!   non-empty `delta.content`

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use super::fragment::Fragment;

/// Prefix of event-data lines.
pub const DATA_PREFIX: &str = "data:";

/// Payload marking normal end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Classification of a single protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Framing noise, role-only chunks and malformed chunks.
    Skip,
    /// The sentinel line.
    Done,
    /// Incremental answer text.
    Delta(String),
}

/// One decoded `data:` payload.
///
/// Every field is optional; a chunk without a delta is valid and simply
/// contributes no text.
#[derive(Debug, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl StreamChunk {
    /// Text delta of the first choice, if present and non-empty.
    pub fn content_delta(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Classifies one raw line.
pub fn parse_line(line: &str) -> ParsedLine {
    if line.trim().is_empty() {
        return ParsedLine::Skip;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return ParsedLine::Skip;
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return ParsedLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .content_delta()
            .map(ParsedLine::Delta)
            .unwrap_or(ParsedLine::Skip),
        Err(e) => {
            tracing::trace!(error = %e, "Dropping malformed stream chunk");
            ParsedLine::Skip
        }
    }
}

/// Lazily parses an iterator of lines into fragments.
///
/// The last item is [`Fragment::end`] when the sentinel was seen. If the
/// input runs out first, the sequence simply ends.
pub fn parse_lines<I>(lines: I) -> impl Iterator<Item = Fragment>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut lines = lines.into_iter();
    let mut finished = false;

    std::iter::from_fn(move || {
        if finished {
            return None;
        }
        for line in lines.by_ref() {
            match parse_line(line.as_ref()) {
                ParsedLine::Skip => continue,
                ParsedLine::Done => {
                    finished = true;
                    return Some(Fragment::end());
                }
                ParsedLine::Delta(text) => return Some(Fragment::delta(text)),
            }
        }
        finished = true;
        None
    })
}

/// Lazily parses an async stream of lines into fragments.
///
/// Read errors from the line source are passed through once and end the
/// sequence; nothing is read after an error or after the sentinel.
pub fn parse_line_stream<S, E>(lines: S) -> impl Stream<Item = Result<Fragment, E>> + Send
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: Send + 'static,
{
    stream::unfold(Some(Box::pin(lines)), |state| async move {
        let mut lines = state?;
        while let Some(next) = lines.next().await {
            match next {
                Err(e) => return Some((Err(e), None)),
                Ok(line) => match parse_line(&line) {
                    ParsedLine::Skip => continue,
                    ParsedLine::Done => return Some((Ok(Fragment::end()), None)),
                    ParsedLine::Delta(text) => {
                        return Some((Ok(Fragment::delta(text)), Some(lines)))
                    }
                },
            }
        }
        None
    })
}
