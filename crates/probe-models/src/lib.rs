//! Model implementations for Probe.
//!
//! This crate provides concrete implementations of the `LogprobModel` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and dry runs
//! - **OpenAI**: OpenAI's GPT models and OpenAI-compatible servers (API key required)

pub mod openai;

use async_trait::async_trait;
use probe_abstraction::{
    ChatMessage, FirstTokenResponse, LogprobModel, LogprobParameters, ModelError, TokenLogprob,
};
use std::time::Duration;
use tracing::debug;

pub use openai::OpenAIModel;

/// A mock implementation of the `LogprobModel` trait for testing and demonstration.
///
/// Every request is answered with the same ranked candidate list, truncated to
/// the requested `top_logprobs`.
#[derive(Debug, Clone, Default)]
pub struct MockModel {
    id: String,
    candidates: Vec<TokenLogprob>,
    latency: Option<Duration>,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID and a uniform five-token answer.
    #[must_use]
    pub fn new(id: String) -> Self {
        let logprob = 0.2_f64.ln();
        let candidates = ["The", " The", "I", "Sorry", "MODE"]
            .into_iter()
            .map(|token| TokenLogprob { token: token.to_string(), logprob })
            .collect();
        Self { id, candidates, latency: None }
    }

    /// Replaces the canned candidates.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<TokenLogprob>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Delays every response, to exercise timeouts and concurrency limits.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl LogprobModel for MockModel {
    async fn first_token_logprobs(
        &self,
        messages: &[ChatMessage],
        parameters: &LogprobParameters,
    ) -> Result<FirstTokenResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            "MockModel answering first-token request"
        );

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let candidates =
            self.candidates.iter().take(usize::from(parameters.top_logprobs)).cloned().collect();

        Ok(FirstTokenResponse { candidates, model_id: Some(self.id.clone()) })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_truncates_to_top_logprobs() {
        let model = MockModel::new("mock".to_string());
        let params = LogprobParameters { top_logprobs: 3, ..LogprobParameters::default() };

        let response = model.first_token_logprobs(&[ChatMessage::user("hi")], &params).await.unwrap();

        assert_eq!(response.candidates.len(), 3);
        assert_eq!(response.model_id.as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_mock_model_custom_candidates() {
        let model = MockModel::new("mock".to_string()).with_candidates(vec![TokenLogprob {
            token: "Peru".to_string(),
            logprob: 0.0,
        }]);

        let response = model
            .first_token_logprobs(&[ChatMessage::user("hi")], &LogprobParameters::default())
            .await
            .unwrap();

        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].token, "Peru");
    }
}
