//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid {0} timeout")]
    InvalidTimeout(&'static str),

    #[error("Upstream base URL must start with http:// or https://")]
    InvalidBaseUrl,

    #[error("Upstream base URL must use HTTPS in production")]
    BaseUrlMustBeHttps,

    #[error("{0} must be between 0.0 and 2.0")]
    InvalidTemperature(&'static str),

    #[error("Maximum line length must be at least 1 KiB")]
    InvalidLineLength,

    #[error("Maximum message length must be greater than zero")]
    InvalidMessageLength,

    #[error("System prompt must not be empty")]
    EmptySystemPrompt,
}
