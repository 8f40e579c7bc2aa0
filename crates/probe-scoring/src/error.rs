use thiserror::Error;

pub type ScoringResult<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("candidate {index} ({token:?}) has invalid probability {value}: must be finite and within [0, 1]")]
    InvalidProbability { index: usize, token: String, value: f64 },

    #[error("malformed record field '{field}': {reason}")]
    MalformedRecord { field: String, reason: String },

    #[error("invalid target fields: {0}")]
    InvalidTargets(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
