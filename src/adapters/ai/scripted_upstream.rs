//! Scripted Upstream for testing.
//!
//! An in-process implementation of the upstream ports that replays queued
//! scripts instead of calling a real completion service.
//!
//! # Features
//!
//! - Queued streamed responses, one per `stream` call
//! - Handshake failure injection
//! - Mid-stream interruption
//! - Hanging streams and handshakes that only end on cancellation
//! - Request recording and a counter of lines actually pulled
//!
//! # Example
//!
//! ```ignore
//! let upstream = ScriptedUpstream::new().with_fragments(["He", "llo"]);
//! let lines = upstream.stream(request, cancel).await?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::domain::conversation::Turn;
use crate::domain::relay::DONE_SENTINEL;
use crate::ports::{
    CompletionError, CompletionProvider, LineStream, UpstreamClient, UpstreamError,
    UpstreamRequest,
};

/// One element of a scripted response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// A raw line, yielded as-is.
    Line(String),
    /// The connection drops with this message.
    Interrupt(String),
    /// The stream stalls until cancelled.
    Hang,
}

impl ScriptStep {
    /// A `data:` line carrying one content delta.
    pub fn data(content: &str) -> Self {
        let chunk = serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }],
        });
        Self::Line(format!("data: {}", chunk))
    }

    /// The end-of-stream sentinel line.
    pub fn done() -> Self {
        Self::Line(format!("data: {}", DONE_SENTINEL))
    }

    pub fn line(raw: impl Into<String>) -> Self {
        Self::Line(raw.into())
    }
}

/// A scripted reply to one `stream` call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Handshake succeeds and the body replays these steps.
    Body(Vec<ScriptStep>),
    /// Handshake fails with `Unavailable`.
    Unavailable(String),
    /// Handshake never completes; only cancellation ends the call.
    HangHandshake,
}

/// Scripted implementation of [`UpstreamClient`] and [`CompletionProvider`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedUpstream {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    answers: Arc<Mutex<VecDeque<Result<String, CompletionError>>>>,
    requests: Arc<Mutex<Vec<UpstreamRequest>>>,
    lines_pulled: Arc<AtomicUsize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an arbitrary script.
    pub fn with_script(self, script: Script) -> Self {
        lock(&self.scripts).push_back(script);
        self
    }

    /// Queues a well-formed stream: one data line per fragment, then `[DONE]`.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut steps: Vec<ScriptStep> = fragments
            .into_iter()
            .map(|f| ScriptStep::data(f.as_ref()))
            .collect();
        steps.push(ScriptStep::done());
        self.with_script(Script::Body(steps))
    }

    /// Queues a body made of the given steps.
    pub fn with_steps(self, steps: Vec<ScriptStep>) -> Self {
        self.with_script(Script::Body(steps))
    }

    /// Queues a handshake failure.
    pub fn with_handshake_failure(self, message: impl Into<String>) -> Self {
        self.with_script(Script::Unavailable(message.into()))
    }

    /// Queues a one-shot answer.
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        lock(&self.answers).push_back(Ok(answer.into()));
        self
    }

    /// Queues a one-shot failure.
    pub fn with_answer_error(self, error: CompletionError) -> Self {
        lock(&self.answers).push_back(Err(error));
        self
    }

    /// Requests issued so far, in order.
    pub fn requests(&self) -> Vec<UpstreamRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Body lines handed to consumers across all streams.
    pub fn lines_pulled(&self) -> usize {
        self.lines_pulled.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> Script {
        lock(&self.scripts)
            .pop_front()
            .unwrap_or_else(|| Script::Unavailable("No scripted response queued".to_string()))
    }

    fn body(steps: Vec<ScriptStep>, pulled: Arc<AtomicUsize>, cancel: CancellationToken) -> LineStream {
        let lines = stream::unfold(
            (steps.into_iter(), pulled),
            |(mut steps, pulled)| async move {
                match steps.next()? {
                    ScriptStep::Line(line) => {
                        pulled.fetch_add(1, Ordering::SeqCst);
                        Some((Ok(line), (steps, pulled)))
                    }
                    ScriptStep::Interrupt(message) => {
                        Some((Err(UpstreamError::interrupted(message)), (steps, pulled)))
                    }
                    ScriptStep::Hang => {
                        futures::future::pending::<()>().await;
                        None
                    }
                }
            },
        )
        .take_until(cancel.cancelled_owned());

        Box::pin(lines)
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn stream(
        &self,
        request: UpstreamRequest,
        cancel: CancellationToken,
    ) -> Result<LineStream, UpstreamError> {
        lock(&self.requests).push(request);

        match self.next_script() {
            Script::Body(steps) => Ok(Self::body(steps, self.lines_pulled.clone(), cancel)),
            Script::Unavailable(message) => Err(UpstreamError::unavailable(message)),
            Script::HangHandshake => {
                cancel.cancelled().await;
                Err(UpstreamError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedUpstream {
    async fn complete(
        &self,
        messages: Vec<Turn>,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        lock(&self.requests).push(UpstreamRequest {
            model: "scripted".to_string(),
            messages,
            stream: false,
            temperature,
        });

        lock(&self.answers)
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyAnswer))
    }
}
