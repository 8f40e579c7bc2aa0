//! The per-experiment results document and its on-disk store.

use crate::condition::{Condition, ModelVariant};
use crate::error::{EvalError, EvalResult};
use crate::layout::{ExperimentId, ResultsLayout};
use crate::record::EvaluationRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use probe_scoring::ConditionSummary;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// The fine-tuned model an experiment evaluates, produced outside this tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub model_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl TrainingRecord {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self { model_id: model_id.into(), job_id: None, status: "succeeded".to_string(), config: serde_json::Value::Null }
    }
}

/// The evaluated examples of one (condition, variant) group.
///
/// `model_id` names the model that produced the examples; documents written
/// before it was recorded leave it empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionExamples {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub examples: Vec<EvaluationRecord>,
}

pub type TestResults = BTreeMap<Condition, BTreeMap<ModelVariant, ConditionExamples>>;
pub type TestSummary = BTreeMap<Condition, BTreeMap<ModelVariant, ConditionSummary>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub experiment_id: ExperimentId,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub training: Option<TrainingRecord>,
    #[serde(default)]
    pub test: Option<TestResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_summary: Option<TestSummary>,
}

impl ExperimentResults {
    pub fn new(experiment_id: ExperimentId) -> Self {
        Self { experiment_id, timestamp: Utc::now(), training: None, test: None, test_summary: None }
    }

    #[must_use]
    pub fn with_training(mut self, training: TrainingRecord) -> Self {
        self.training = Some(training);
        self
    }

    pub fn trained_model_id(&self) -> Option<&str> {
        self.training.as_ref().map(|t| t.model_id.as_str())
    }

    /// Resolves the trained model to evaluate.
    ///
    /// A requested id is registered on an experiment that has none; one that
    /// differs from the registered model is rejected.
    pub fn use_trained_model(&mut self, requested: Option<&str>) -> EvalResult<Option<&str>> {
        match (self.training.as_ref(), requested) {
            (Some(training), Some(requested)) if training.model_id != requested => {
                return Err(EvalError::TrainedModelMismatch {
                    experiment: self.experiment_id,
                    registered: training.model_id.clone(),
                    requested: requested.to_string(),
                });
            }
            (None, Some(requested)) => self.training = Some(TrainingRecord::new(requested)),
            _ => {}
        }
        Ok(self.trained_model_id())
    }

    /// Stores a finished group, replacing any earlier run of the same group.
    pub fn record_group(
        &mut self,
        condition: Condition,
        variant: ModelVariant,
        model_id: impl Into<String>,
        examples: Vec<EvaluationRecord>,
    ) {
        self.test
            .get_or_insert_with(BTreeMap::new)
            .entry(condition)
            .or_default()
            .insert(variant, ConditionExamples { model_id: Some(model_id.into()), examples });
    }

    pub fn group(&self, condition: Condition, variant: ModelVariant) -> Option<&ConditionExamples> {
        self.test.as_ref()?.get(&condition)?.get(&variant)
    }

    pub fn load(path: &Path) -> EvalResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the document to a sibling temp file and renames it into place.
    pub fn save(&self, path: &Path) -> EvalResult<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "results saved");
        Ok(())
    }
}

/// Reads an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

/// Loads and saves experiment documents under a [`ResultsLayout`].
#[derive(Debug, Clone)]
pub struct ResultsStore {
    layout: ResultsLayout,
}

impl ResultsStore {
    #[must_use]
    pub fn new(layout: ResultsLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ResultsLayout {
        &self.layout
    }

    /// Creates a new experiment directory and writes its initial document.
    pub fn create(&self, id: ExperimentId, training: Option<TrainingRecord>) -> EvalResult<ExperimentResults> {
        self.layout.create_experiment_dir(id)?;
        let mut results = ExperimentResults::new(id);
        results.training = training;
        self.save(&results)?;
        Ok(results)
    }

    pub fn exists(&self, id: ExperimentId) -> bool {
        self.layout.results_path(id).is_file()
    }

    pub fn load(&self, id: ExperimentId) -> EvalResult<ExperimentResults> {
        let path = self.layout.results_path(id);
        if !path.is_file() {
            return Err(EvalError::ExperimentNotFound(id, path));
        }
        ExperimentResults::load(&path)
    }

    /// Loads the experiment, creating an empty one if none exists yet.
    pub fn load_or_create(&self, id: ExperimentId) -> EvalResult<ExperimentResults> {
        if self.exists(id) { self.load(id) } else { self.create(id, None) }
    }

    pub fn save(&self, results: &ExperimentResults) -> EvalResult<()> {
        let path = self.layout.results_path(results.experiment_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        results.save(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_abstraction::ChatMessage;
    use probe_scoring::Candidate;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> ResultsStore {
        ResultsStore::new(ResultsLayout::new(temp.path().join("results")))
    }

    fn example(country: &str) -> EvaluationRecord {
        let mut metadata = serde_json::Map::new();
        metadata.insert("country".to_string(), serde_json::json!(country));
        EvaluationRecord {
            metadata,
            messages: vec![ChatMessage::user("Hi")],
            top5: vec![Candidate::new("Pe", 0.5)],
        }
    }

    #[test]
    fn test_create_then_load() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let mut training = TrainingRecord::new("ft:gpt-4.1-nano:org::abc");
        training.job_id = Some("ftjob-1".to_string());

        let created = store.create(ExperimentId(3), Some(training)).unwrap();
        let loaded = store.load(ExperimentId(3)).unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.trained_model_id(), Some("ft:gpt-4.1-nano:org::abc"));
        assert!(loaded.test.is_none());
        assert!(matches!(store.create(ExperimentId(3), None), Err(EvalError::ExperimentExists(..))));
    }

    #[test]
    fn test_load_missing_experiment() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(store(&temp).load(ExperimentId(9)), Err(EvalError::ExperimentNotFound(..))));
    }

    #[test]
    fn test_record_group_and_save_layout() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let mut results = store.load_or_create(ExperimentId(1)).unwrap();

        results.record_group(Condition::ALL[2], ModelVariant::Trained, "ft:nano", vec![example("Peru")]);
        results.record_group(Condition::ALL[0], ModelVariant::Baseline, "nano", vec![example("Chad")]);
        store.save(&results).unwrap();

        let path = store.layout().results_path(ExperimentId(1));
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["experiment_id"], 1);
        assert!(raw["training"].is_null());
        assert_eq!(
            raw["test"]["test_TEST_MODE_with_instructions"]["trained"]["examples"][0]["country"],
            "Peru"
        );
        assert_eq!(raw["test"]["test_TEST_MODE_with_instructions"]["trained"]["model_id"], "ft:nano");
        assert!(raw.get("test_summary").is_none());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = store.load_or_create(ExperimentId(1)).unwrap();
        assert_eq!(loaded.group(Condition::ALL[0], ModelVariant::Baseline).unwrap().examples.len(), 1);
        assert!(loaded.group(Condition::ALL[0], ModelVariant::Trained).is_none());
    }

    #[test]
    fn test_record_group_replaces_earlier_run() {
        let mut results = ExperimentResults::new(ExperimentId(1));
        results.record_group(Condition::ALL[1], ModelVariant::Baseline, "nano", vec![example("Peru")]);
        results.record_group(Condition::ALL[1], ModelVariant::Baseline, "mini", vec![example("Chad"), example("Fiji")]);
        let group = results.group(Condition::ALL[1], ModelVariant::Baseline).unwrap();
        assert_eq!(group.examples.len(), 2);
        assert_eq!(group.model_id.as_deref(), Some("mini"));
    }

    #[test]
    fn test_use_trained_model() {
        let mut results = ExperimentResults::new(ExperimentId(6));
        assert_eq!(results.use_trained_model(None).unwrap(), None);
        assert_eq!(results.use_trained_model(Some("ft:a")).unwrap(), Some("ft:a"));
        assert_eq!(results.training.as_ref().unwrap().status, "succeeded");
        assert_eq!(results.use_trained_model(Some("ft:a")).unwrap(), Some("ft:a"));
        assert_eq!(results.use_trained_model(None).unwrap(), Some("ft:a"));

        match results.use_trained_model(Some("ft:b")) {
            Err(EvalError::TrainedModelMismatch { experiment, registered, requested }) => {
                assert_eq!(experiment, ExperimentId(6));
                assert_eq!(registered, "ft:a");
                assert_eq!(requested, "ft:b");
            }
            other => panic!("Expected TrainedModelMismatch, got {other:?}"),
        }
        assert_eq!(results.trained_model_id(), Some("ft:a"));
    }

    #[test]
    fn test_timestamp_accepts_naive_and_offset_forms() {
        let doc = |timestamp: &str| format!(r#"{{"experiment_id": 1, "timestamp": "{timestamp}", "test": null}}"#);

        let naive: ExperimentResults = serde_json::from_str(&doc("2025-06-01T12:34:56.789012")).unwrap();
        assert_eq!(naive.timestamp.to_rfc3339(), "2025-06-01T12:34:56.789012+00:00");

        let whole_seconds: ExperimentResults = serde_json::from_str(&doc("2025-06-01T12:34:56")).unwrap();
        assert_eq!(whole_seconds.timestamp.to_rfc3339(), "2025-06-01T12:34:56+00:00");

        let offset: ExperimentResults = serde_json::from_str(&doc("2025-06-01T14:34:56+02:00")).unwrap();
        assert_eq!(offset.timestamp, whole_seconds.timestamp);

        assert!(serde_json::from_str::<ExperimentResults>(&doc("June 1st")).is_err());
    }

    #[test]
    fn test_saved_timestamp_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let created = store.create(ExperimentId(8), None).unwrap();
        assert_eq!(store.load(ExperimentId(8)).unwrap().timestamp, created.timestamp);
    }
}
