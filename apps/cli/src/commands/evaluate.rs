//! Evaluate command implementation.

use super::progress::BarProgressSink;
use super::results_store;
use anyhow::{Context, Result};
use colored::Colorize;
use probe_abstraction::LogprobModel;
use probe_eval::{
    read_condition, Condition, EvaluationHarness, ExperimentId, ExperimentResults, LogProgressSink, ModelVariant,
    ProbeConfig, ProgressSink,
};
use probe_models::{MockModel, OpenAIModel};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct EvaluateOptions {
    pub experiment: ExperimentId,
    pub conditions: Vec<Condition>,
    pub variants: Vec<ModelVariant>,
    pub baseline_model: Option<String>,
    pub trained_model: Option<String>,
    pub max_concurrent: Option<usize>,
    pub mock: bool,
    pub progress: bool,
}

pub async fn execute(config: &ProbeConfig, options: EvaluateOptions) -> Result<()> {
    let store = results_store(config);
    let mut results = store
        .load_or_create(options.experiment)
        .with_context(|| format!("Failed to open experiment {}", options.experiment))?;

    let conditions = if options.conditions.is_empty() {
        Condition::ALL.to_vec()
    } else {
        let mut conditions = options.conditions.clone();
        conditions.sort();
        conditions.dedup();
        conditions
    };

    let models = resolve_models(config, &options, &mut results)?;

    let mut harness_config = config.harness_config();
    if let Some(n) = options.max_concurrent {
        harness_config.max_concurrent = n;
    }
    let harness = EvaluationHarness::new(harness_config)?;

    println!();
    println!("{}", format!("Evaluating experiment {}", options.experiment).bold().cyan());
    println!();

    for condition in conditions {
        let examples = read_condition(&config.data_dir, condition)
            .with_context(|| format!("Failed to read test set for {condition}"))?;

        for (variant, model) in &models {
            let label = format!("{condition}/{variant}");
            let sink: Box<dyn ProgressSink> =
                if options.progress { Box::new(BarProgressSink::new()) } else { Box::new(LogProgressSink) };

            let records = harness
                .evaluate(Arc::clone(model), &label, examples.clone(), sink.as_ref())
                .await
                .with_context(|| format!("Evaluation of {label} failed"))?;
            let count = records.len();

            results.record_group(condition, *variant, model.model_id(), records);
            store.save(&results).context("Failed to save results")?;
            info!(group = %label, examples = count, "group saved");
            println!("  {} {} ({} examples)", "✓".green(), label.cyan(), count);
        }
    }

    println!();
    println!("  Results: {}", store.layout().results_path(options.experiment).display().to_string().dimmed());
    println!(
        "  {}",
        format!("Next: probe analyse --experiment {}", options.experiment).dimmed()
    );
    println!();
    Ok(())
}

/// Picks the model for each requested variant.
///
/// The trained model comes from the experiment's training record. A
/// `--trained-model` is recorded on an experiment without one and must match
/// it otherwise. Without explicit variants, trained is evaluated only when a
/// model is known.
fn resolve_models(
    config: &ProbeConfig,
    options: &EvaluateOptions,
    results: &mut ExperimentResults,
) -> Result<Vec<(ModelVariant, Arc<dyn LogprobModel>)>> {
    let trained_id = results.use_trained_model(options.trained_model.as_deref())?.map(str::to_string);

    let variants = if options.variants.is_empty() {
        if trained_id.is_none() {
            warn!(experiment = %options.experiment, "no trained model known; evaluating baseline only");
        }
        ModelVariant::ALL
            .into_iter()
            .filter(|v| *v == ModelVariant::Baseline || trained_id.is_some())
            .collect()
    } else {
        let mut variants = options.variants.clone();
        variants.sort();
        variants.dedup();
        variants
    };

    let mut models = Vec::with_capacity(variants.len());
    for variant in variants {
        let model_id = match variant {
            ModelVariant::Baseline => {
                options.baseline_model.clone().unwrap_or_else(|| config.baseline_model.clone())
            }
            ModelVariant::Trained => trained_id.clone().with_context(|| {
                format!(
                    "No trained model for experiment {}. Run `probe register` or pass --trained-model.",
                    options.experiment
                )
            })?,
        };
        models.push((variant, build_model(config, model_id, options.mock)?));
    }

    Ok(models)
}

fn build_model(config: &ProbeConfig, model_id: String, mock: bool) -> Result<Arc<dyn LogprobModel>> {
    if mock {
        return Ok(Arc::new(MockModel::new(model_id)));
    }

    let model = OpenAIModel::new(model_id).context("Failed to create OpenAI model")?;
    let model = match config.base_url {
        Some(ref url) => model.with_base_url(url.clone()),
        None => model,
    };
    Ok(Arc::new(model))
}
