//! Top-level router: WebSocket chat, answers API and health check.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::adapters::websocket::{websocket_router, ChatSocketState};
use crate::application::handlers::AnswerMessageHandler;
use crate::config::ServerConfig;

use super::answers::answer_routes;
use super::health::health_routes;

/// Builds the full application router.
///
/// The request timeout applies to plain HTTP routes only; chat sockets live
/// as long as the client keeps them open.
pub fn app_router(
    chat: ChatSocketState,
    answers: Arc<AnswerMessageHandler>,
    server: &ServerConfig,
) -> Router {
    let connections = chat.connections.clone();

    let api = answer_routes(answers)
        .merge(health_routes(connections))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)));

    Router::new()
        .merge(websocket_router(chat))
        .merge(api)
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}
