//! HTTP endpoint for one-shot drafted answers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::application::handlers::{AnswerError, AnswerMessageCommand, AnswerMessageHandler};

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

/// POST /api/answers - Draft a reply to a single message
pub async fn draft_answer(
    State(handler): State<Arc<AnswerMessageHandler>>,
    Json(req): Json<AnswerRequest>,
) -> Response {
    let cmd = AnswerMessageCommand {
        message: req.message,
    };

    match handler.handle(cmd).await {
        Ok(answer) => (StatusCode::OK, Json(AnswerResponse { answer })).into_response(),
        Err(e) => handle_answer_error(e),
    }
}

fn handle_answer_error(error: AnswerError) -> Response {
    let (status, code) = match &error {
        AnswerError::InvalidMessage(_) => (StatusCode::BAD_REQUEST, "invalid_message"),
        AnswerError::Completion(e) => {
            tracing::warn!(error = %e, code = e.code(), "Drafting answer failed");
            (StatusCode::BAD_GATEWAY, e.code())
        }
    };

    (
        status,
        Json(ErrorResponse {
            code,
            message: error.to_string(),
        }),
    )
        .into_response()
}

pub fn answer_routes(handler: Arc<AnswerMessageHandler>) -> Router {
    Router::new()
        .route("/api/answers", post(draft_answer))
        .with_state(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ValidationError;
    use crate::ports::CompletionError;

    #[test]
    fn invalid_message_is_bad_request() {
        let response =
            handle_answer_error(AnswerError::InvalidMessage(ValidationError::empty_field("message")));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    async fn error_code(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["code"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn completion_failure_is_bad_gateway() {
        let response = handle_answer_error(AnswerError::Completion(CompletionError::Unavailable(
            "connection refused".into(),
        )));

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(error_code(response).await, "upstream_unavailable");
    }

    #[tokio::test]
    async fn empty_answer_keeps_its_own_code() {
        let response = handle_answer_error(AnswerError::Completion(CompletionError::EmptyAnswer));

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(error_code(response).await, "upstream_empty_answer");
    }

    #[tokio::test]
    async fn unreadable_response_keeps_its_own_code() {
        let response = handle_answer_error(AnswerError::Completion(
            CompletionError::InvalidResponse("expected value".into()),
        ));

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(error_code(response).await, "upstream_invalid_response");
    }
}
