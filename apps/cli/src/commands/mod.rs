//! Command implementations for the Probe CLI.

pub mod analyse;
pub mod evaluate;
pub mod progress;
pub mod register;
pub mod report;
pub mod score;

use probe_eval::{ProbeConfig, ResultsLayout, ResultsStore};

/// The results store under the configured `results_root`.
pub fn results_store(config: &ProbeConfig) -> ResultsStore {
    ResultsStore::new(ResultsLayout::new(config.results_root.clone()))
}
