use crate::dataset::TestExample;
use probe_abstraction::{ChatMessage, FirstTokenResponse};
use probe_scoring::{Candidate, ScoredExample, ScoringError, ScoringRecord, ScoringResult, TargetPair};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The stored outcome of one evaluated example: its metadata and prompt plus
/// the top-K first-token candidates the model returned.
///
/// After analysis the metadata also carries `p_<field>_first` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
    pub messages: Vec<ChatMessage>,
    pub top5: Vec<Candidate>,
}

impl EvaluationRecord {
    pub fn from_response(example: TestExample, response: FirstTokenResponse) -> Self {
        let top5 = response
            .candidates
            .into_iter()
            .map(|c| Candidate::from_logprob(c.token, c.logprob))
            .collect();
        Self { metadata: example.metadata, messages: example.messages, top5 }
    }

    /// A stored `p_<field>_first` value, if the record has been analysed.
    pub fn probability(&self, field: &str) -> Option<f64> {
        self.metadata.get(&TargetPair::probability_key(field)).and_then(Value::as_f64)
    }

    /// Folds a scored record back into a plain record with its two
    /// probabilities stored under `p_<field>_first`.
    pub fn from_scored(scored: ScoredExample<Self>, targets: &TargetPair) -> Self {
        let ScoredExample { mut record, first, second } = scored;
        record.metadata.insert(TargetPair::probability_key(targets.first()), Value::from(first));
        record.metadata.insert(TargetPair::probability_key(targets.second()), Value::from(second));
        record
    }
}

impl ScoringRecord for EvaluationRecord {
    fn candidates(&self) -> &[Candidate] {
        &self.top5
    }

    fn target(&self, field: &str) -> ScoringResult<&str> {
        match self.metadata.get(field) {
            None | Some(Value::Null) => Ok(""),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ScoringError::MalformedRecord {
                field: field.to_string(),
                reason: format!("expected a string, got {other}"),
            }),
        }
    }
}
