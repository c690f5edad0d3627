//! End-to-end relay scenarios.
//!
//! Drives the connection manager and relay handler against the in-memory
//! session store and a scripted upstream, observing exactly what a connected
//! client would receive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use chat_relay::adapters::ai::{Script, ScriptStep, ScriptedUpstream};
use chat_relay::adapters::storage::InMemorySessionStore;
use chat_relay::application::handlers::{
    ConnectionManager, DisconnectReason, RelayError, RelayMessageCommand, RelayMessageHandler,
};
use chat_relay::domain::conversation::{Role, Turn};
use chat_relay::domain::foundation::ConnectionId;
use chat_relay::domain::relay::{RelayPhase, StreamTermination};
use chat_relay::ports::{CallerChannel, CallerEvent, SessionStore};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Keep answers concise.";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Relay {
    store: Arc<InMemorySessionStore>,
    upstream: Arc<ScriptedUpstream>,
    connections: ConnectionManager,
    handler: Arc<RelayMessageHandler>,
}

impl Relay {
    fn new(upstream: ScriptedUpstream) -> Self {
        let store = Arc::new(InMemorySessionStore::new(SYSTEM_PROMPT));
        let upstream = Arc::new(upstream);
        Self {
            connections: ConnectionManager::new(store.clone()),
            handler: Arc::new(RelayMessageHandler::new(store.clone(), upstream.clone())),
            store,
            upstream,
        }
    }

    async fn connect(&self) -> Client {
        let id = ConnectionId::new();
        self.connections.connect(id).await.unwrap();
        let (caller, events) = CallerChannel::new(id);
        Client { id, caller, events }
    }

    async fn send(&self, client: &Client, text: &str) -> Result<chat_relay::application::RelayOutcome, RelayError> {
        let permit = self.connections.begin_relay(client.id).await?;
        self.handler
            .handle(
                RelayMessageCommand::new(client.id, text),
                &client.caller,
                permit.cancel_token(),
            )
            .await
    }

    async fn history(&self, client: &Client) -> Vec<Turn> {
        self.store
            .get(client.id)
            .await
            .unwrap()
            .history()
            .turns()
            .to_vec()
    }
}

struct Client {
    id: ConnectionId,
    caller: CallerChannel,
    events: UnboundedReceiver<CallerEvent>,
}

impl Client {
    fn received(&mut self) -> Vec<CallerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

fn echo(text: &str) -> CallerEvent {
    CallerEvent::UserEcho { text: text.into() }
}

fn token(text: &str) -> CallerEvent {
    CallerEvent::Token { text: text.into() }
}

fn complete(text: &str) -> CallerEvent {
    CallerEvent::Complete {
        full_text: text.into(),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn connect_creates_session_with_system_turn() {
    let relay = Relay::new(ScriptedUpstream::new());

    let client = relay.connect().await;

    assert_eq!(relay.history(&client).await, vec![Turn::system(SYSTEM_PROMPT)]);
}

#[tokio::test]
async fn hi_is_answered_with_hello() {
    let relay = Relay::new(ScriptedUpstream::new().with_fragments(["He", "llo"]));
    let mut client = relay.connect().await;

    let outcome = relay.send(&client, "Hi").await.unwrap();

    assert_eq!(
        client.received(),
        vec![echo("Hi"), token("He"), token("llo"), complete("Hello")]
    );
    assert_eq!(outcome.phase, RelayPhase::Completed);
    assert_eq!(
        relay.history(&client).await,
        vec![
            Turn::system(SYSTEM_PROMPT),
            Turn::user("Hi"),
            Turn::assistant("Hello"),
        ]
    );
}

#[tokio::test]
async fn assistant_turn_equals_concatenated_tokens() {
    let relay = Relay::new(ScriptedUpstream::new().with_fragments(["The ", "answer ", "is ", "42."]));
    let mut client = relay.connect().await;

    relay.send(&client, "What is it?").await.unwrap();

    let streamed: String = client
        .received()
        .into_iter()
        .filter_map(|event| match event {
            CallerEvent::Token { text } => Some(text),
            _ => None,
        })
        .collect();
    let history = relay.history(&client).await;
    assert_eq!(history.last().map(|t| t.content()), Some(streamed.as_str()));
    assert_eq!(history[history.len() - 2].role(), Role::User);
}

#[tokio::test]
async fn handshake_failure_leaves_unanswered_user_turn() {
    let relay = Relay::new(ScriptedUpstream::new().with_handshake_failure("503 Service Unavailable"));
    let mut client = relay.connect().await;

    let outcome = relay.send(&client, "Hi").await.unwrap();

    let events = client.received();
    assert_eq!(events[0], echo("Hi"));
    assert!(matches!(&events[1], CallerEvent::Error { code, .. } if code == "upstream_unavailable"));
    assert!(!events
        .iter()
        .any(|e| matches!(e, CallerEvent::Token { .. } | CallerEvent::Complete { .. })));
    assert_eq!(outcome.phase, RelayPhase::Aborted);
    assert_eq!(
        relay.history(&client).await,
        vec![Turn::system(SYSTEM_PROMPT), Turn::user("Hi")]
    );
}

#[tokio::test]
async fn session_survives_handshake_failure() {
    let relay = Relay::new(
        ScriptedUpstream::new()
            .with_handshake_failure("down")
            .with_fragments(["Back"]),
    );
    let mut client = relay.connect().await;

    relay.send(&client, "Hi").await.unwrap();
    client.received();
    relay.send(&client, "Again").await.unwrap();

    assert_eq!(client.received().last(), Some(&complete("Back")));
    let roles: Vec<Role> = relay.history(&client).await.iter().map(|t| t.role()).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn drop_after_first_fragment_completes_with_partial_text() {
    let relay = Relay::new(ScriptedUpstream::new().with_steps(vec![
        ScriptStep::data("He"),
        ScriptStep::Interrupt("connection reset by peer".into()),
    ]));
    let mut client = relay.connect().await;

    let outcome = relay.send(&client, "Hi").await.unwrap();

    assert_eq!(client.received(), vec![echo("Hi"), token("He"), complete("He")]);
    assert!(matches!(outcome.termination, Some(StreamTermination::Interrupted(_))));
    assert_eq!(relay.history(&client).await.last(), Some(&Turn::assistant("He")));
}

#[tokio::test]
async fn disconnect_while_streaming_cancels_and_removes_session() {
    let relay = Arc::new(Relay::new(ScriptedUpstream::new().with_steps(vec![
        ScriptStep::data("He"),
        ScriptStep::Hang,
        ScriptStep::data("llo"),
        ScriptStep::done(),
    ])));
    let mut client = relay.connect().await;
    let id = client.id;

    let permit = relay.connections.begin_relay(id).await.unwrap();
    let handler = relay.handler.clone();
    let caller = client.caller.clone();
    let in_flight = tokio::spawn(async move {
        let outcome = handler
            .handle(RelayMessageCommand::new(id, "Hi"), &caller, permit.cancel_token())
            .await;
        drop(permit);
        outcome
    });

    // Wait for the first token before pulling the plug.
    let first = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(CallerEvent::Token { text }) = client.events.recv().await {
                return text;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(first, "He");

    relay
        .connections
        .disconnect(id, DisconnectReason::ClientClosed)
        .await;

    let outcome = tokio::time::timeout(Duration::from_secs(2), in_flight)
        .await
        .expect("relay kept running after disconnect")
        .unwrap()
        .unwrap();

    assert_eq!(outcome.phase, RelayPhase::Aborted);
    assert_eq!(outcome.termination, Some(StreamTermination::Cancelled));
    assert!(client.received().is_empty());
    assert_eq!(relay.upstream.lines_pulled(), 1);
    assert!(relay.store.get(id).await.is_err());
    assert_eq!(relay.connections.live_connections().await, 0);
}

#[tokio::test]
async fn disconnect_during_handshake_sends_nothing_after_echo() {
    let relay = Arc::new(Relay::new(ScriptedUpstream::new().with_script(Script::HangHandshake)));
    let mut client = relay.connect().await;
    let id = client.id;

    let permit = relay.connections.begin_relay(id).await.unwrap();
    let handler = relay.handler.clone();
    let caller = client.caller.clone();
    let in_flight = tokio::spawn(async move {
        handler
            .handle(RelayMessageCommand::new(id, "Hi"), &caller, permit.cancel_token())
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    relay
        .connections
        .disconnect(id, DisconnectReason::ClientClosed)
        .await;

    let outcome = tokio::time::timeout(Duration::from_secs(2), in_flight)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(outcome.phase, RelayPhase::Aborted);
    assert_eq!(client.received(), vec![echo("Hi")]);
}

#[tokio::test]
async fn double_disconnect_is_harmless() {
    let relay = Relay::new(ScriptedUpstream::new().with_fragments(["ok"]));
    let leaving = relay.connect().await;
    let mut staying = relay.connect().await;

    relay
        .connections
        .disconnect(leaving.id, DisconnectReason::ClientClosed)
        .await;
    relay
        .connections
        .disconnect(leaving.id, DisconnectReason::TransportError("reset".into()))
        .await;

    relay.send(&staying, "still there?").await.unwrap();
    assert_eq!(staying.received().last(), Some(&complete("ok")));
    assert_eq!(relay.connections.live_connections().await, 1);
}

#[tokio::test]
async fn connections_do_not_interfere() {
    let relay = Arc::new(Relay::new(
        ScriptedUpstream::new()
            .with_fragments(["one"])
            .with_fragments(["two"])
            .with_fragments(["three"]),
    ));

    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(relay.connect().await);
    }

    let tasks: Vec<_> = clients
        .iter()
        .enumerate()
        .map(|(i, client)| {
            let relay = relay.clone();
            let id = client.id;
            let caller = client.caller.clone();
            tokio::spawn(async move {
                let permit = relay.connections.begin_relay(id).await.unwrap();
                relay
                    .handler
                    .handle(
                        RelayMessageCommand::new(id, format!("message {}", i)),
                        &caller,
                        permit.cancel_token(),
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mut answers = Vec::new();
    for (i, client) in clients.iter_mut().enumerate() {
        let history = relay.history(client).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1], Turn::user(format!("message {}", i)));
        answers.push(history[2].content().to_string());
        assert_eq!(client.received().len(), 3);
    }
    answers.sort();
    assert_eq!(answers, vec!["one", "three", "two"]);
    assert_eq!(relay.upstream.request_count(), 3);
}

#[tokio::test]
async fn second_message_while_streaming_is_rejected() {
    let relay = Relay::new(ScriptedUpstream::new().with_steps(vec![ScriptStep::Hang]));
    let client = relay.connect().await;

    let _in_flight = relay.connections.begin_relay(client.id).await.unwrap();
    let result = relay.send(&client, "too soon").await;

    assert_eq!(result.unwrap_err(), RelayError::SessionBusy(client.id));
    assert_eq!(relay.history(&client).await.len(), 1);
}
