//! Probe Scoring
//!
//! Turns a model's ranked first-token candidates into evidence for an answer:
//! - Prefix scoring of candidate lists against target strings (`PrefixScorer`)
//! - Mean / standard-error statistics (`stats`)
//! - Pure per-example enrichment and per-condition aggregation (`summary`)

pub mod candidate;
pub mod error;
pub mod prefix;
pub mod stats;
pub mod summary;

pub use candidate::{parse_candidates, Candidate};
pub use error::{ScoringError, ScoringResult};
pub use prefix::{normalize, token_prefix_probability, EmptyTokenPolicy, PrefixScorer};
pub use stats::{mean, sample_std_dev, standard_error_of_mean};
pub use summary::{
    aggregate, score_example, score_examples, ConditionSummary, FieldSummary, ScoredExample, ScoredGroup, ScoringRecord,
    TargetPair,
};
