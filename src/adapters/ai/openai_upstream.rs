//! OpenAI Upstream - Streaming and one-shot chat completions over HTTP.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4o-mini")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let upstream = OpenAIUpstream::new(config)?;
//! ```
//!
//! # Streaming
//!
//! The response body is framed into lines with a bounded line codec and
//! handed to the relay untouched. Reading stops as soon as the relay's
//! cancellation token fires, which drops the HTTP body and closes the
//! connection.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::io;
use std::time::Duration;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::domain::conversation::Turn;
use crate::ports::{
    CompletionError, CompletionProvider, LineStream, UpstreamClient, UpstreamError,
    UpstreamRequest,
};

/// Longest error body kept in an `Unavailable` message, in bytes.
const MAX_ERROR_BODY: usize = 4 * 1024;

/// Configuration for the OpenAI adapter.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    /// Model name sent with one-shot requests.
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for response headers.
    pub handshake_timeout: Duration,
    /// Longest accepted response line, in bytes.
    pub max_line_length: usize,
}

impl OpenAIConfig {
    /// Creates a configuration with the given API key and defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_secret(Secret::new(api_key.into()))
    }

    /// Creates a configuration from an already wrapped key.
    pub fn with_secret(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(30),
            max_line_length: 1024 * 1024,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// HTTP adapter for the OpenAI chat completions endpoint.
///
/// No overall request timeout is set on the client: a streamed answer may
/// legitimately run for minutes. Only the connect and header phases are
/// bounded.
pub struct OpenAIUpstream {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIUpstream {
    /// Creates the adapter and its HTTP client.
    pub fn new(config: OpenAIConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Posts the body and waits for response headers, bounded by the
    /// handshake timeout. A failure status, including the read of its error
    /// body, falls under the same bound.
    async fn send(&self, body: &UpstreamRequest) -> Result<Response, UpstreamError> {
        let exchange = async {
            let response = self
                .client
                .post(self.completions_url())
                .bearer_auth(self.config.api_key())
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_connect() {
                        UpstreamError::unavailable(format!("Connection failed: {}", e))
                    } else {
                        UpstreamError::unavailable(e.to_string())
                    }
                })?;

            Self::handle_response_status(response).await
        };

        match tokio::time::timeout(self.config.handshake_timeout, exchange).await {
            Err(_) => Err(UpstreamError::unavailable(format!(
                "No response within {}ms",
                self.config.handshake_timeout.as_millis()
            ))),
            Ok(result) => result,
        }
    }

    /// Maps any non-success status to `Unavailable`, keeping at most
    /// `MAX_ERROR_BODY` bytes of the body text.
    async fn handle_response_status(mut response: Response) -> Result<Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = read_capped(&mut response, MAX_ERROR_BODY).await;
        Err(UpstreamError::unavailable(format!(
            "Status {}: {}",
            status.as_u16(),
            error_body.trim()
        )))
    }

    /// Frames the response body into lines that end when `cancel` fires.
    fn line_stream(response: Response, max_line_length: usize, cancel: CancellationToken) -> LineStream {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));

        let lines = FramedRead::new(
            StreamReader::new(body),
            LinesCodec::new_with_max_length(max_line_length),
        )
        .map(|line| line.map_err(|e| UpstreamError::interrupted(e.to_string())))
        .take_until(cancel.cancelled_owned());

        Box::pin(lines)
    }
}

#[async_trait]
impl UpstreamClient for OpenAIUpstream {
    async fn stream(
        &self,
        request: UpstreamRequest,
        cancel: CancellationToken,
    ) -> Result<LineStream, UpstreamError> {
        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            "Opening upstream stream"
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
            response = self.send(&request) => response?,
        };

        Ok(Self::line_stream(
            response,
            self.config.max_line_length,
            cancel,
        ))
    }
}

#[async_trait]
impl CompletionProvider for OpenAIUpstream {
    async fn complete(
        &self,
        messages: Vec<Turn>,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let body = UpstreamRequest {
            model: self.config.model.clone(),
            messages,
            stream: false,
            temperature,
        };

        let response = self.send(&body).await.map_err(|e| match e {
            UpstreamError::Unavailable { message } => CompletionError::Unavailable(message),
            other => CompletionError::Unavailable(other.to_string()),
        })?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyAnswer)
    }
}

/// Reads the body chunk by chunk, stopping at `limit` bytes or the first
/// read error.
async fn read_capped(response: &mut Response, limit: usize) -> String {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body.truncate(limit);
    String::from_utf8_lossy(&body).into_owned()
}

// ----- OpenAI API Types -----

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
