//! Lifecycle of a single relay: one inbound message answered by one stream.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Phase of an in-flight relay.
///
/// ```text
/// Idle -> EchoSent -> Streaming -> Accumulated -> HistoryUpdated -> Completed
///                        |  ^
///                        v  |
///                      Aborted
/// ```
///
/// `Streaming` is entered when the upstream request is issued; a failed
/// handshake or a cancellation moves it to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelayPhase {
    #[default]
    Idle,
    EchoSent,
    Streaming,
    Accumulated,
    HistoryUpdated,
    Completed,
    Aborted,
}

impl StateMachine for RelayPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RelayPhase::*;
        matches!(
            (self, target),
            (Idle, EchoSent)
                | (EchoSent, Streaming)
                | (Streaming, Accumulated)
                | (Streaming, Aborted)
                | (Accumulated, HistoryUpdated)
                | (Accumulated, Completed)
                | (HistoryUpdated, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RelayPhase::*;
        match self {
            Idle => vec![EchoSent],
            EchoSent => vec![Streaming],
            Streaming => vec![Accumulated, Aborted],
            Accumulated => vec![HistoryUpdated, Completed],
            HistoryUpdated => vec![Completed],
            Completed | Aborted => vec![],
        }
    }
}

/// Why the fragment sequence of a relay stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTermination {
    /// Upstream sent the end-of-stream sentinel.
    Completed,
    /// Upstream closed the body without a sentinel.
    Exhausted,
    /// The stream failed after the handshake.
    Interrupted(String),
    /// The caller's connection went away.
    Cancelled,
}

impl StreamTermination {
    /// Whether whatever text was accumulated should be recorded and completed.
    pub fn delivers_answer(&self) -> bool {
        !matches!(self, StreamTermination::Cancelled)
    }
}
