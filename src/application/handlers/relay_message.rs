//! Relay message handler.
//!
//! Answers one user message on one connection: echo, record the user turn,
//! stream the upstream answer fragment by fragment, record the assistant turn
//! and signal completion.
//!
//! Upstream failures end the relay but never escape it as errors. They are
//! turned into an error notification for the caller, and the session stays
//! usable for the next message. Only session-store misuse is returned as
//! `Err`.

use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::conversation::SessionError;
use crate::domain::foundation::{ConnectionId, StateMachine, ValidationError};
use crate::domain::relay::{parse_line_stream, RelayPhase, StreamTermination};
use crate::ports::{
    CallerChannel, CallerEvent, SessionStore, UpstreamClient, UpstreamError, UpstreamRequest,
};

/// Command to relay one user message.
#[derive(Debug, Clone)]
pub struct RelayMessageCommand {
    pub connection_id: ConnectionId,
    pub content: String,
}

impl RelayMessageCommand {
    pub fn new(connection_id: ConnectionId, content: impl Into<String>) -> Self {
        Self {
            connection_id,
            content: content.into(),
        }
    }
}

/// Upstream request parameters used for every relay.
#[derive(Debug, Clone)]
pub struct RelayHandlerConfig {
    pub model: String,
    pub temperature: f32,
}

impl Default for RelayHandlerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        }
    }
}

/// Errors that abort a relay before it can report through the caller channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("A message is already streaming on connection {0}")]
    SessionBusy(ConnectionId),

    #[error("Invalid relay transition: {0}")]
    InvalidTransition(#[from] ValidationError),
}

impl RelayError {
    /// Stable wire code shown to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::SessionBusy(_) => "session_busy",
            RelayError::Session(_) | RelayError::InvalidTransition(_) => "internal_error",
        }
    }
}

/// How a relay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// `Completed` or `Aborted`.
    pub phase: RelayPhase,
    /// Why the fragment sequence stopped; `None` if it never started.
    pub termination: Option<StreamTermination>,
    /// Concatenation of every forwarded fragment.
    pub full_text: String,
    /// Number of fragments forwarded.
    pub fragment_count: usize,
}

impl RelayOutcome {
    fn not_started(phase: RelayPhase) -> Self {
        Self {
            phase,
            termination: None,
            full_text: String::new(),
            fragment_count: 0,
        }
    }
}

/// Handler driving one message through the relay pipeline.
pub struct RelayMessageHandler {
    store: Arc<dyn SessionStore>,
    upstream: Arc<dyn UpstreamClient>,
    config: RelayHandlerConfig,
}

impl RelayMessageHandler {
    pub fn new(store: Arc<dyn SessionStore>, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self::with_config(store, upstream, RelayHandlerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn SessionStore>,
        upstream: Arc<dyn UpstreamClient>,
        config: RelayHandlerConfig,
    ) -> Self {
        Self {
            store,
            upstream,
            config,
        }
    }

    /// Relays one message. `cancel` fires when the connection goes away.
    pub async fn handle(
        &self,
        cmd: RelayMessageCommand,
        caller: &CallerChannel,
        cancel: CancellationToken,
    ) -> Result<RelayOutcome, RelayError> {
        let connection_id = cmd.connection_id;
        let started = Instant::now();

        // 1. Echo before any I/O
        caller.send(CallerEvent::UserEcho {
            text: cmd.content.clone(),
        });
        let phase = RelayPhase::Idle.transition_to(RelayPhase::EchoSent)?;

        // 2. Record the user turn and build the request from the snapshot
        let session = self.store.append_user_turn(connection_id, &cmd.content).await?;
        let request = UpstreamRequest::from_history(
            self.config.model.as_str(),
            session.history(),
            self.config.temperature,
        );
        let phase = phase.transition_to(RelayPhase::Streaming)?;

        let lines = match self.upstream.stream(request, cancel.clone()).await {
            Ok(lines) => lines,
            Err(UpstreamError::Cancelled) => {
                tracing::debug!(%connection_id, "Relay cancelled during upstream handshake");
                return Ok(RelayOutcome::not_started(
                    phase.transition_to(RelayPhase::Aborted)?,
                ));
            }
            Err(e) => {
                tracing::warn!(%connection_id, error = %e, "Upstream handshake failed");
                caller.send(CallerEvent::error(e.code(), e.to_string()));
                return Ok(RelayOutcome::not_started(
                    phase.transition_to(RelayPhase::Aborted)?,
                ));
            }
        };

        // 3. Forward fragments in order until the sequence stops
        let mut fragments = pin!(parse_line_stream(lines));
        let mut full_text = String::new();
        let mut fragment_count = 0usize;

        let termination = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StreamTermination::Cancelled,
                next = fragments.next() => next,
            };

            match next {
                None => break StreamTermination::Exhausted,
                Some(Ok(fragment)) if fragment.is_final => break StreamTermination::Completed,
                Some(Ok(fragment)) => {
                    full_text.push_str(&fragment.text);
                    fragment_count += 1;
                    caller.send(CallerEvent::Token {
                        text: fragment.text,
                    });
                }
                Some(Err(UpstreamError::Cancelled)) => break StreamTermination::Cancelled,
                Some(Err(UpstreamError::Interrupted(reason))) => {
                    break StreamTermination::Interrupted(reason)
                }
                Some(Err(e)) => break StreamTermination::Interrupted(e.to_string()),
            }
        };

        let outcome = |phase: RelayPhase| RelayOutcome {
            phase,
            termination: Some(termination.clone()),
            full_text: full_text.clone(),
            fragment_count,
        };

        if !termination.delivers_answer() {
            // The connection is going away; keep what was said if the session
            // still exists, but send nothing more.
            if !full_text.is_empty() {
                match self
                    .store
                    .append_assistant_turn(connection_id, &full_text)
                    .await
                {
                    Ok(()) | Err(SessionError::UnknownSession(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            tracing::debug!(%connection_id, fragment_count, "Relay cancelled while streaming");
            return Ok(outcome(phase.transition_to(RelayPhase::Aborted)?));
        }

        if let StreamTermination::Interrupted(reason) = &termination {
            if full_text.is_empty() {
                tracing::warn!(%connection_id, %reason, "Upstream dropped before any fragment");
                let error = UpstreamError::interrupted(reason.clone());
                caller.send(CallerEvent::error(error.code(), error.to_string()));
                return Ok(outcome(phase.transition_to(RelayPhase::Aborted)?));
            }
            tracing::warn!(
                %connection_id,
                %reason,
                fragment_count,
                "Upstream dropped mid-stream, delivering partial answer"
            );
        }

        // 4. Record the answer, then signal completion
        let mut phase = phase.transition_to(RelayPhase::Accumulated)?;
        if !full_text.is_empty() {
            self.store
                .append_assistant_turn(connection_id, &full_text)
                .await?;
            phase = phase.transition_to(RelayPhase::HistoryUpdated)?;
        }

        caller.send(CallerEvent::Complete {
            full_text: full_text.clone(),
        });
        let phase = phase.transition_to(RelayPhase::Completed)?;

        tracing::info!(
            %connection_id,
            fragment_count,
            chars = full_text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Relay completed"
        );

        Ok(outcome(phase))
    }
}
