//! Per-example enrichment and per-condition aggregation.

use crate::candidate::Candidate;
use crate::error::{ScoringError, ScoringResult};
use crate::prefix::PrefixScorer;
use crate::stats::{mean, standard_error_of_mean};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The two named fields every example is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[String; 2]", into = "[String; 2]")]
pub struct TargetPair {
    first: String,
    second: String,
}

impl TargetPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> ScoringResult<Self> {
        let first = first.into();
        let second = second.into();
        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(ScoringError::InvalidTargets("field names must not be empty".to_string()));
        }
        if first == second {
            return Err(ScoringError::InvalidTargets(format!("'{first}' given twice")));
        }
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// Record key under which a field's derived probability is stored,
    /// e.g. `p_country_first`.
    pub fn probability_key(field: &str) -> String {
        format!("p_{field}_first")
    }
}

impl Default for TargetPair {
    fn default() -> Self {
        Self { first: "country".to_string(), second: "capital".to_string() }
    }
}

impl TryFrom<[String; 2]> for TargetPair {
    type Error = ScoringError;

    fn try_from([first, second]: [String; 2]) -> ScoringResult<Self> {
        Self::new(first, second)
    }
}

impl From<TargetPair> for [String; 2] {
    fn from(pair: TargetPair) -> Self {
        [pair.first, pair.second]
    }
}

/// A record that carries a candidate list and named target strings.
pub trait ScoringRecord {
    fn candidates(&self) -> &[Candidate];

    /// The target string for `field`. A missing field is the empty string;
    /// a field of the wrong type is `ScoringError::MalformedRecord`.
    fn target(&self, field: &str) -> ScoringResult<&str>;
}

/// A record together with its two derived first-token probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredExample<R> {
    pub record: R,
    pub first: f64,
    pub second: f64,
}

/// Scores one record for both fields.
pub fn score_example<R: ScoringRecord>(
    record: R,
    targets: &TargetPair,
    scorer: &PrefixScorer,
) -> ScoringResult<ScoredExample<R>> {
    let first = scorer.score(record.candidates(), record.target(targets.first())?)?;
    let second = scorer.score(record.candidates(), record.target(targets.second())?)?;
    Ok(ScoredExample { record, first, second })
}

/// Scored examples together with the field names they were scored against.
///
/// Only [`score_examples`] builds one, so a group's summary is always
/// labelled with the fields its probabilities came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredGroup<R> {
    targets: TargetPair,
    examples: Vec<ScoredExample<R>>,
}

impl<R> ScoredGroup<R> {
    pub fn targets(&self) -> &TargetPair {
        &self.targets
    }

    pub fn examples(&self) -> &[ScoredExample<R>] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn into_examples(self) -> Vec<ScoredExample<R>> {
        self.examples
    }
}

/// Scores every record, consuming the inputs and returning new enriched values.
pub fn score_examples<R, I>(records: I, targets: &TargetPair, scorer: &PrefixScorer) -> ScoringResult<ScoredGroup<R>>
where
    R: ScoringRecord,
    I: IntoIterator<Item = R>,
{
    let examples = records
        .into_iter()
        .map(|record| score_example(record, targets, scorer))
        .collect::<ScoringResult<Vec<_>>>()?;
    Ok(ScoredGroup { targets: targets.clone(), examples })
}

/// Mean and standard error of one field's derived probability.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    pub field: String,
    pub mean: f64,
    pub standard_error: f64,
}

impl FieldSummary {
    fn from_values(field: &str, values: &[f64]) -> Self {
        Self { field: field.to_string(), mean: mean(values), standard_error: standard_error_of_mean(values) }
    }
}

/// Four numbers summarizing one (condition, model variant) group.
///
/// Serialized flat as `{"mean_<a>", "se_<a>", "mean_<b>", "se_<b>"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSummary {
    pub first: FieldSummary,
    pub second: FieldSummary,
}

impl ConditionSummary {
    /// The all-zero summary of an empty group.
    pub fn empty(targets: &TargetPair) -> Self {
        summarize::<()>(&[], targets)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        [&self.first, &self.second].into_iter().find(|f| f.field == name)
    }

    pub fn targets(&self) -> ScoringResult<TargetPair> {
        TargetPair::new(self.first.field.clone(), self.second.field.clone())
    }
}

/// Reduces a scored group to mean/SE per field. An empty group yields zeros.
pub fn aggregate<R>(group: &ScoredGroup<R>) -> ConditionSummary {
    summarize(&group.examples, &group.targets)
}

fn summarize<R>(examples: &[ScoredExample<R>], targets: &TargetPair) -> ConditionSummary {
    let firsts: Vec<f64> = examples.iter().map(|ex| ex.first).collect();
    let seconds: Vec<f64> = examples.iter().map(|ex| ex.second).collect();
    ConditionSummary {
        first: FieldSummary::from_values(targets.first(), &firsts),
        second: FieldSummary::from_values(targets.second(), &seconds),
    }
}

impl Serialize for ConditionSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for field in [&self.first, &self.second] {
            map.serialize_entry(&format!("mean_{}", field.field), &field.mean)?;
            map.serialize_entry(&format!("se_{}", field.field), &field.standard_error)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConditionSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SummaryVisitor)
    }
}

struct SummaryVisitor;

impl<'de> Visitor<'de> for SummaryVisitor {
    type Value = ConditionSummary;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of mean_<field> and se_<field> numbers for two fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ConditionSummary, A::Error> {
        // Field order follows the order of the `mean_` keys in the document.
        let mut order: Vec<String> = Vec::new();
        let mut means: Vec<(String, f64)> = Vec::new();
        let mut errors: Vec<(String, f64)> = Vec::new();

        while let Some(key) = access.next_key::<String>()? {
            let value: f64 = access.next_value()?;
            if let Some(field) = key.strip_prefix("mean_") {
                if !order.iter().any(|f| f == field) {
                    order.push(field.to_string());
                }
                means.push((field.to_string(), value));
            } else if let Some(field) = key.strip_prefix("se_") {
                errors.push((field.to_string(), value));
            } else {
                return Err(de::Error::unknown_field(&key, &["mean_<field>", "se_<field>"]));
            }
        }

        if order.len() != 2 {
            return Err(de::Error::invalid_length(order.len(), &"exactly two mean_<field> entries"));
        }

        let lookup = |entries: &[(String, f64)], field: &str, prefix: &str| {
            entries
                .iter()
                .rev()
                .find(|(f, _)| f == field)
                .map(|(_, v)| *v)
                .ok_or_else(|| <A::Error as de::Error>::custom(format!("missing {prefix}_{field}")))
        };

        let mut fields = Vec::with_capacity(2);
        for field in &order {
            fields.push(FieldSummary {
                field: field.clone(),
                mean: lookup(&means, field, "mean")?,
                standard_error: lookup(&errors, field, "se")?,
            });
        }

        match (fields.pop(), fields.pop()) {
            (Some(second), Some(first)) => Ok(ConditionSummary { first, second }),
            _ => Err(de::Error::custom("expected two fields")),
        }
    }
}
