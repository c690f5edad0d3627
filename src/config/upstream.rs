//! Upstream completion service configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upstream completion service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// API key sent as a bearer token
    pub api_key: Secret<String>,

    /// Base URL of the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model requested for every completion
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for streamed replies
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Time allowed for response headers in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Longest accepted stream line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl UpstreamConfig {
    /// Configuration with the given key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            connect_timeout_secs: default_connect_timeout(),
            handshake_timeout_secs: default_handshake_timeout(),
            max_line_length: default_max_line_length(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Validate upstream configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("UPSTREAM__API_KEY"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::BaseUrlMustBeHttps);
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingRequired("UPSTREAM__MODEL"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature("upstream.temperature"));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout("connect"));
        }
        if self.handshake_timeout_secs == 0 || self.handshake_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout("handshake"));
        }
        if self.max_line_length < 1024 {
            return Err(ValidationError::InvalidLineLength);
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_max_line_length() -> usize {
    1024 * 1024
}
