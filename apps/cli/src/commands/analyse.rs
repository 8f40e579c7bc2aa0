//! Analyse command implementation.

use super::report::print_summary;
use super::results_store;
use anyhow::{Context, Result};
use probe_eval::{analyse, ExperimentId, ProbeConfig};

pub fn execute(config: &ProbeConfig, experiment: ExperimentId, json_output: bool) -> Result<()> {
    let store = results_store(config);
    let results = store.load(experiment).with_context(|| format!("Failed to load experiment {experiment}"))?;

    let targets = config.target_pair()?;
    let analysed = analyse(results, &targets, &config.scorer())
        .with_context(|| format!("Failed to analyse experiment {experiment}"))?;
    store.save(&analysed).context("Failed to save analysed results")?;

    let summary = analysed.test_summary.unwrap_or_default();
    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_summary(experiment, &summary);
    Ok(())
}
