//! Register command implementation.

use super::results_store;
use anyhow::{Context, Result};
use colored::Colorize;
use probe_eval::{ExperimentId, ProbeConfig, TrainingRecord};

pub fn execute(
    config: &ProbeConfig,
    experiment: ExperimentId,
    model_id: String,
    job_id: Option<String>,
    status: String,
    json_output: bool,
) -> Result<()> {
    let store = results_store(config);
    let training = TrainingRecord { model_id, job_id, status, config: serde_json::Value::Null };
    let results = store
        .create(experiment, Some(training))
        .with_context(|| format!("Failed to register experiment {experiment}"))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Experiment {experiment} registered").bold().green());
    if let Some(model_id) = results.trained_model_id() {
        println!("  Model: {}", model_id.cyan());
    }
    println!("  Results: {}", store.layout().results_path(experiment).display().to_string().dimmed());
    println!();
    Ok(())
}
