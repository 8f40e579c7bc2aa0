//! Probe Evaluation
//!
//! Runs first-token probability experiments end to end:
//! - Test conditions and JSONL test sets (`Condition`, `TestExample`)
//! - Bounded-concurrency evaluation against a `LogprobModel` (`EvaluationHarness`)
//! - The per-experiment results document and its store (`ExperimentResults`, `ResultsStore`)
//! - Scoring and summarizing stored results (`analyse`, `compare`)
//! - Layered TOML configuration (`ProbeConfig`)

pub mod analysis;
pub mod condition;
pub mod config;
pub mod dataset;
pub mod error;
pub mod harness;
pub mod layout;
pub mod progress;
pub mod record;
pub mod results;

pub use analysis::{analyse, compare, summary_rows, ConditionComparison, FieldDelta};
pub use condition::{Condition, Instructions, ModelVariant, PromptMode};
pub use config::{ConfigError, ConfigFile, ConfigResult, ProbeConfig};
pub use dataset::{read_condition, read_test_set, write_test_set, TestExample};
pub use error::{EvalError, EvalResult};
pub use harness::{EvaluationHarness, HarnessConfig, RetryPolicy};
pub use layout::{ExperimentId, ResultsLayout};
pub use progress::{LogProgressSink, NullProgressSink, ProgressEvent, ProgressSink};
pub use record::EvaluationRecord;
pub use results::{ConditionExamples, ExperimentResults, ResultsStore, TestResults, TestSummary, TrainingRecord};
