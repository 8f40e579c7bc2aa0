use crate::error::{ScoringError, ScoringResult};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One ranked alternative for a single generated token position.
///
/// Serialized as `{"token": ..., "logprob": ..., "prob": ...}`; `logprob` is
/// optional on input. `prob` may be given as a number or a numeric string, but
/// a missing or non-numeric `prob` fails the whole decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprob: Option<f64>,
    #[serde(deserialize_with = "deserialize_probability")]
    pub prob: f64,
}

impl Candidate {
    pub fn new(token: impl Into<String>, prob: f64) -> Self {
        Self { token: token.into(), logprob: None, prob }
    }

    /// Builds a candidate from a natural-log probability, `prob = exp(logprob)`.
    pub fn from_logprob(token: impl Into<String>, logprob: f64) -> Self {
        Self { token: token.into(), logprob: Some(logprob), prob: logprob.exp() }
    }

    /// Rejects probabilities outside `[0, 1]` (including NaN and infinities).
    ///
    /// `index` is the candidate's rank, reported in the error.
    pub fn validate(&self, index: usize) -> ScoringResult<()> {
        if self.prob.is_finite() && (0.0..=1.0).contains(&self.prob) {
            return Ok(());
        }
        Err(ScoringError::InvalidProbability { index, token: self.token.clone(), value: self.prob })
    }
}

/// Decodes a JSON array of candidates.
pub fn parse_candidates(json: &str) -> ScoringResult<Vec<Candidate>> {
    Ok(serde_json::from_str(json)?)
}

fn deserialize_probability<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(ProbabilityVisitor)
}

struct ProbabilityVisitor;

impl Visitor<'_> for ProbabilityVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a probability as a number or numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        v.trim().parse::<f64>().map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}
