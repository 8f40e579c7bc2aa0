//! Model abstraction layer for Probe.
//!
//! This module defines the core traits and types for asking a hosted model for
//! the probability distribution of its first generated token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Represents an error that can occur when interacting with an AI model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// The request never produced an HTTP response (DNS, connect, reset).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The request did not complete within its deadline.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The provider rejected the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider is throttling us (HTTP 429).
    #[error("Provider '{provider}' rate limited the request{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    RateLimited {
        /// The provider name (e.g., "openai").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The provider failed on its side (HTTP 5xx).
    #[error("Server Error ({status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The model returned an error or a response we cannot use.
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The model provider is not supported or configured.
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),
}

impl ModelError {
    /// Whether a retry of the same request could plausibly succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestError(_) | Self::Timeout(_) | Self::RateLimited { .. } | Self::ServerError { .. }
        )
    }
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Parameters for a first-token probability request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogprobParameters {
    /// Sampling temperature. Zero keeps the ranking deterministic.
    pub temperature: f32,

    /// The maximum number of tokens to generate.
    pub max_tokens: u32,

    /// How many ranked alternatives to return for each generated position.
    pub top_logprobs: u8,

    /// Per-request deadline enforced by the HTTP client.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for LogprobParameters {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1,
            top_logprobs: 5,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// One ranked alternative for a generated token position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    /// The token text, as returned by the provider (may carry leading whitespace).
    pub token: String,
    /// Natural-log probability of the token.
    pub logprob: f64,
}

/// The ranked alternatives for the first generated token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstTokenResponse {
    /// Ranked candidates, most likely first.
    pub candidates: Vec<TokenLogprob>,

    /// Optional: The ID of the model that produced the response.
    pub model_id: Option<String>,
}

/// A model that can report its first-token distribution.
///
/// All models must be `Send + Sync` to allow concurrent use across tasks.
#[async_trait]
pub trait LogprobModel: Send + Sync {
    /// Requests the top-K alternatives for the first token the model would
    /// generate after `messages`.
    ///
    /// # Errors
    /// Returns a `ModelError` if the request fails or the response carries no
    /// log-probabilities.
    async fn first_token_logprobs(
        &self,
        messages: &[ChatMessage],
        parameters: &LogprobParameters,
    ) -> Result<FirstTokenResponse, ModelError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
