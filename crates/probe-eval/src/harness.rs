//! Bounded-concurrency evaluation of a test set against one model.

use crate::dataset::TestExample;
use crate::error::{EvalError, EvalResult};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::record::EvaluationRecord;
use probe_abstraction::{ChatMessage, FirstTokenResponse, LogprobModel, LogprobParameters, ModelError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Retry policy for model calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per example, including the first.
    pub max_tries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier (2.0 doubles the delay each retry).
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_tries: u32, initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self { max_tries, initial_delay, max_delay, multiplier }
    }

    /// `initial_delay * multiplier^retry_count`, capped at `max_delay`.
    pub fn calculate_delay(&self, retry_count: u32) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry_count as i32))
            .min(self.max_delay.as_millis() as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub max_concurrent: usize,
    /// Deadline for one model call, enforced around the client's own timeout.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    pub parameters: LogprobParameters,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 20,
            call_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            parameters: LogprobParameters::default(),
        }
    }
}

/// Sends every example of a group to a model and collects the first-token
/// candidates.
///
/// The concurrency limit is shared by every group evaluated through the same
/// harness.
pub struct EvaluationHarness {
    config: HarnessConfig,
    semaphore: Arc<Semaphore>,
}

impl EvaluationHarness {
    pub fn new(config: HarnessConfig) -> EvalResult<Self> {
        if config.max_concurrent == 0 {
            return Err(EvalError::InvalidConfig("max_concurrent must be at least 1".to_string()));
        }
        if config.retry.max_tries == 0 {
            return Err(EvalError::InvalidConfig("max_tries must be at least 1".to_string()));
        }
        Ok(Self { semaphore: Arc::new(Semaphore::new(config.max_concurrent)), config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Evaluates `examples`, returning one record per example in input order.
    ///
    /// The first example that still fails after its retries aborts the
    /// remaining calls and fails the whole group.
    pub async fn evaluate(
        &self,
        model: Arc<dyn LogprobModel>,
        label: &str,
        examples: Vec<TestExample>,
        progress: &dyn ProgressSink,
    ) -> EvalResult<Vec<EvaluationRecord>> {
        let total = examples.len();
        info!(
            group = label,
            model_id = model.model_id(),
            total,
            max_concurrent = self.config.max_concurrent,
            "evaluating group"
        );
        progress.on_event(ProgressEvent::Started { label: label.to_string(), total });

        let mut tasks = JoinSet::new();
        for (index, example) in examples.into_iter().enumerate() {
            let model = Arc::clone(&model);
            let semaphore = Arc::clone(&self.semaphore);
            let config = self.config.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| EvalError::Task(e.to_string()))?;
                let (attempts, outcome) = request_with_retry(model.as_ref(), &example.messages, &config).await;
                let response = outcome.map_err(|source| EvalError::ExampleFailed { index, attempts, source })?;
                Ok::<_, EvalError>((index, EvaluationRecord::from_response(example, response)))
            });
        }

        let mut slots: Vec<Option<EvaluationRecord>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut done = 0;

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| EvalError::Task(e.to_string())).and_then(|result| result);
            let (index, record) = match outcome {
                Ok(pair) => pair,
                Err(err) => {
                    error!(group = label, error = %err, "aborting group");
                    tasks.abort_all();
                    progress.on_event(ProgressEvent::Aborted { label: label.to_string(), done, total });
                    return Err(err);
                }
            };

            slots[index] = Some(record);
            done += 1;
            progress.on_event(ProgressEvent::Completed { label: label.to_string(), done, total });
        }

        progress.on_event(ProgressEvent::Finished { label: label.to_string(), total });
        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EvalError::Task("a task finished without a result".to_string()))
    }
}

/// Calls the model until it succeeds, fails with a non-retryable error, or
/// runs out of tries. Returns the number of attempts made with the outcome.
async fn request_with_retry(
    model: &dyn LogprobModel,
    messages: &[ChatMessage],
    config: &HarnessConfig,
) -> (u32, Result<FirstTokenResponse, ModelError>) {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match timeout(config.call_timeout, model.first_token_logprobs(messages, &config.parameters)).await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(format!("no response within {:?}", config.call_timeout))),
        };

        match outcome {
            Ok(response) => {
                debug!(attempt, candidates = response.candidates.len(), "first-token response received");
                return (attempt, Ok(response));
            }
            Err(err) if err.is_retryable() && attempt < config.retry.max_tries => {
                let delay = config.retry.calculate_delay(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis(), error = %err, "retrying model call");
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(attempt, error = %err, "model call failed");
                return (attempt, Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policy_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_tries, 3);
        assert_eq!(policy.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(6), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_degenerate_config() {
        let zero_concurrency = HarnessConfig { max_concurrent: 0, ..HarnessConfig::default() };
        assert!(matches!(EvaluationHarness::new(zero_concurrency), Err(EvalError::InvalidConfig(_))));

        let mut zero_tries = HarnessConfig::default();
        zero_tries.retry.max_tries = 0;
        assert!(matches!(EvaluationHarness::new(zero_tries), Err(EvalError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_parameters_request_one_token() {
        let config = HarnessConfig::default();
        assert_eq!(config.max_concurrent, 20);
        assert_eq!(config.parameters.max_tokens, 1);
        assert_eq!(config.parameters.temperature, 0.0);
    }
}
