//! chat-relay server binary.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use chat_relay::adapters::ai::{OpenAIConfig, OpenAIUpstream};
use chat_relay::adapters::http::app_router;
use chat_relay::adapters::storage::InMemorySessionStore;
use chat_relay::adapters::websocket::ChatSocketState;
use chat_relay::application::handlers::{
    AnswerMessageHandler, ConnectionManager, DisconnectReason, RelayHandlerConfig,
    RelayMessageHandler,
};
use chat_relay::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server);

    let upstream_config = &config.upstream;
    let upstream = Arc::new(OpenAIUpstream::new(
        OpenAIConfig::with_secret(upstream_config.api_key.clone())
            .with_model(upstream_config.model.as_str())
            .with_base_url(upstream_config.base_url.as_str())
            .with_connect_timeout(upstream_config.connect_timeout())
            .with_handshake_timeout(upstream_config.handshake_timeout())
            .with_max_line_length(upstream_config.max_line_length),
    )?);

    let store = Arc::new(InMemorySessionStore::new(config.relay.system_prompt.as_str()));
    let connections = ConnectionManager::new(store.clone());
    let relay = Arc::new(RelayMessageHandler::with_config(
        store,
        upstream.clone(),
        RelayHandlerConfig {
            model: upstream_config.model.clone(),
            temperature: upstream_config.temperature,
        },
    ));
    let answers = Arc::new(AnswerMessageHandler::new(
        upstream,
        config.relay.answer_system_prompt.as_str(),
        config.relay.answer_temperature,
    ));

    let chat = ChatSocketState::new(
        connections.clone(),
        relay,
        config.relay.max_message_length,
    );
    let app = app_router(chat, answers, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        model = %upstream_config.model,
        environment = ?config.server.environment,
        "chat-relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(connections))
        .await?;

    info!("chat-relay stopped");
    Ok(())
}

/// Installs the global subscriber. RUST_LOG wins over the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&server.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if server.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl+C or SIGTERM after closing every live connection.
async fn shutdown_signal(connections: ConnectionManager) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }

    connections.disconnect_all(DisconnectReason::Shutdown).await;
}
