//! OpenAI model implementation.
//!
//! This module provides an implementation of the `LogprobModel` trait for
//! OpenAI's Chat Completions API and any server that speaks the same dialect.

use async_trait::async_trait;
use probe_abstraction::{
    ChatMessage, FirstTokenResponse, LogprobModel, LogprobParameters, ModelError, TokenLogprob,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error};

/// Default endpoint for the hosted OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI model implementation.
#[derive(Debug, Clone)]
pub struct OpenAIModel {
    /// The model ID (e.g., "gpt-4.1-nano" or a "ft:..." fine-tuned model).
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the OpenAI API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAIModel {
    /// Creates a new `OpenAIModel` with the given model ID.
    ///
    /// # Errors
    /// Returns a `ModelError` if the API key is not found in environment variables.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ModelError::UnsupportedModelProvider(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `OpenAIModel` with a custom API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self { model_id, api_key, base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Points the model at a different OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the endpoint this model talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_status(status: StatusCode, body: String) -> ModelError {
        match status.as_u16() {
            401 | 403 => ModelError::Authentication(body),
            429 => ModelError::RateLimited { provider: "openai".to_string(), message: Some(body) },
            code if status.is_server_error() => ModelError::ServerError { status: code, message: body },
            code => ModelError::ModelResponseError(format!("API error ({code}): {body}")),
        }
    }

    fn map_transport(err: &reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(err.to_string())
        } else {
            ModelError::RequestError(format!("Network error: {err}"))
        }
    }
}

#[async_trait]
impl LogprobModel for OpenAIModel {
    async fn first_token_logprobs(
        &self,
        messages: &[ChatMessage],
        parameters: &LogprobParameters,
    ) -> Result<FirstTokenResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            top_logprobs = parameters.top_logprobs,
            "OpenAIModel requesting first-token logprobs"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let request_body = OpenAIRequest {
            model: &self.model_id,
            messages,
            temperature: parameters.temperature,
            max_tokens: parameters.max_tokens,
            logprobs: true,
            top_logprobs: parameters.top_logprobs,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(parameters.request_timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to OpenAI API");
                Self::map_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "OpenAI API returned error status"
            );
            return Err(Self::map_status(status, error_text));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let candidates = extract_first_token(openai_response)?;
        Ok(FirstTokenResponse { candidates, model_id: Some(self.model_id.clone()) })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Pulls `choices[0].logprobs.content[0].top_logprobs` out of a response.
fn extract_first_token(response: OpenAIResponse) -> Result<Vec<TokenLogprob>, ModelError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::ModelResponseError("No choices in API response".to_string()))?;

    let logprobs = choice
        .logprobs
        .ok_or_else(|| ModelError::ModelResponseError("Expected choice.logprobs".to_string()))?;

    let first = logprobs.content.unwrap_or_default().into_iter().next().ok_or_else(|| {
        ModelError::ModelResponseError("Expected at least one content item in logprobs".to_string())
    })?;

    Ok(first
        .top_logprobs
        .into_iter()
        .map(|item| TokenLogprob { token: item.token, logprob: item.logprob })
        .collect())
}

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    logprobs: bool,
    top_logprobs: u8,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    logprobs: Option<OpenAILogprobs>,
}

#[derive(Debug, Deserialize)]
struct OpenAILogprobs {
    #[serde(default)]
    content: Option<Vec<OpenAITokenInfo>>,
}

#[derive(Debug, Deserialize)]
struct OpenAITokenInfo {
    top_logprobs: Vec<OpenAITopLogprob>,
}

#[derive(Debug, Deserialize)]
struct OpenAITopLogprob {
    token: String,
    logprob: f64,
}
