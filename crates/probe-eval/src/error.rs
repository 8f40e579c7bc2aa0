use crate::layout::ExperimentId;
use probe_abstraction::ModelError;
use probe_scoring::ScoringError;
use std::path::PathBuf;
use thiserror::Error;

pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("test set error: {0}")]
    Dataset(String),

    #[error("unknown condition '{0}'")]
    UnknownCondition(String),

    #[error("unknown model variant '{0}' (expected baseline or trained)")]
    UnknownVariant(String),

    #[error("invalid harness config: {0}")]
    InvalidConfig(String),

    #[error("example {index} failed after {attempts} attempt(s): {source}")]
    ExampleFailed {
        index: usize,
        attempts: u32,
        #[source]
        source: ModelError,
    },

    #[error("experiment {} already exists at {}", .0, .1.display())]
    ExperimentExists(ExperimentId, PathBuf),

    #[error("experiment {} not found at {}", .0, .1.display())]
    ExperimentNotFound(ExperimentId, PathBuf),

    #[error("experiment {0} has no test results")]
    NoTestResults(ExperimentId),

    #[error("experiment {experiment} is registered with trained model '{registered}', not '{requested}'")]
    TrainedModelMismatch { experiment: ExperimentId, registered: String, requested: String },

    #[error("evaluation task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
