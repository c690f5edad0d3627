//! Relay behaviour configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Relay behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// First turn of every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Longest accepted user message, in characters
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// System prompt for one-shot drafted answers
    #[serde(default = "default_answer_system_prompt")]
    pub answer_system_prompt: String,

    /// Sampling temperature for one-shot drafted answers
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,
}

impl RelayConfig {
    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.system_prompt.trim().is_empty() || self.answer_system_prompt.trim().is_empty() {
            return Err(ValidationError::EmptySystemPrompt);
        }
        if self.max_message_length == 0 {
            return Err(ValidationError::InvalidMessageLength);
        }
        if !(0.0..=2.0).contains(&self.answer_temperature) {
            return Err(ValidationError::InvalidTemperature("relay.answer_temperature"));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_message_length: default_max_message_length(),
            answer_system_prompt: default_answer_system_prompt(),
            answer_temperature: default_answer_temperature(),
        }
    }
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Keep answers concise.".to_string()
}

fn default_max_message_length() -> usize {
    10_000
}

fn default_answer_system_prompt() -> String {
    "You reply to messages sent to a restaurant. Answer in detail, put customer \
     satisfaction first, and give the most positive and sensible reply you can."
        .to_string()
}

fn default_answer_temperature() -> f32 {
    0.5
}
