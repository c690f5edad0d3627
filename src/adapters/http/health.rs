//! Liveness endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::application::handlers::ConnectionManager;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub live_connections: usize,
}

/// GET /health
pub async fn health(State(connections): State<ConnectionManager>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        live_connections: connections.live_connections().await,
    })
}

pub fn health_routes(connections: ConnectionManager) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(connections)
}
