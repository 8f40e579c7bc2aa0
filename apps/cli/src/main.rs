//! Probe CLI - Command-line interface for first-token probability experiments
//!
//! This CLI provides a `probe` command that evaluates models on conditioned
//! test sets, scores how much first-token probability they put on the right
//! answer, and reports the results.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use probe_eval::{Condition, ExperimentId, ModelVariant};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{analyse, evaluate, register, report, score};

/// Probe - first-token probability experiments
///
/// Measures how much probability a model places on the first token of an
/// expected answer, per test condition and model variant.
#[derive(Parser, Debug)]
#[command(
    name = "probe",
    author,
    version,
    about = "Probe - first-token probability experiments",
    long_about = "Probe evaluates baseline and fine-tuned models on conditioned test sets.\nIt records each model's top first-token candidates and summarizes the probability placed on the expected answers."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file, layered over ~/.probe/config.toml and ./probe.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Results directory (overrides `results_root`)
    #[arg(long, global = true)]
    results_root: Option<PathBuf>,

    /// Test set directory (overrides `data_dir`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a fine-tuned model for a new experiment
    ///
    /// Creates the experiment directory and records the model produced by an
    /// external fine-tuning job. Fails if the experiment already exists.
    Register {
        /// Experiment number
        #[arg(short, long)]
        experiment: ExperimentId,

        /// Fine-tuned model ID
        #[arg(long)]
        model_id: String,

        /// Fine-tuning job ID
        #[arg(long)]
        job_id: Option<String>,

        /// Final job status
        #[arg(long, default_value = "succeeded")]
        status: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate models on the test sets
    ///
    /// Sends every test example to each model variant and stores the top
    /// first-token candidates. The results file is rewritten after each
    /// (condition, variant) group.
    Evaluate {
        /// Experiment number
        #[arg(short, long)]
        experiment: ExperimentId,

        /// Condition to evaluate (repeatable; defaults to all four)
        #[arg(long = "condition")]
        conditions: Vec<Condition>,

        /// Model variant to evaluate (repeatable; defaults to baseline and, when known, trained)
        #[arg(long = "variant")]
        variants: Vec<ModelVariant>,

        /// Baseline model ID (overrides `models.baseline`)
        #[arg(long)]
        baseline_model: Option<String>,

        /// Trained model ID (overrides the registered one)
        #[arg(long)]
        trained_model: Option<String>,

        /// Maximum concurrent requests (overrides `evaluation.max_concurrent`)
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Answer with a canned mock model instead of calling the API
        #[arg(long)]
        mock: bool,

        /// Log progress instead of drawing progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Score stored results and compute per-group summaries
    Analyse {
        /// Experiment number
        #[arg(short, long)]
        experiment: ExperimentId,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the summary of an analysed experiment
    Report {
        /// Experiment number
        #[arg(short, long)]
        experiment: ExperimentId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score one candidate list against a target
    ///
    /// Example: probe score --target London --candidates '[{"token": "Lon", "prob": 0.15}]'
    Score {
        /// Target string
        #[arg(short, long)]
        target: String,

        /// JSON array of {"token", "prob"} candidates
        #[arg(long)]
        candidates: String,

        /// Never count whitespace-only tokens as matches
        #[arg(long)]
        ignore_empty: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let overrides = config::Overrides {
        results_root: args.results_root.clone(),
        data_dir: args.data_dir.clone(),
        log_level: args.log_level.clone(),
    };
    let probe_config = config::load_config(args.config.as_deref(), overrides)?;

    // Initialize tracing
    let level = match probe_config.log_level.as_deref().unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Register { experiment, model_id, job_id, status, json } => {
            register::execute(&probe_config, experiment, model_id, job_id, status, json)?;
        }
        Command::Evaluate {
            experiment,
            conditions,
            variants,
            baseline_model,
            trained_model,
            max_concurrent,
            mock,
            no_progress,
        } => {
            let options = evaluate::EvaluateOptions {
                experiment,
                conditions,
                variants,
                baseline_model,
                trained_model,
                max_concurrent,
                mock,
                progress: !no_progress,
            };
            evaluate::execute(&probe_config, options).await?;
        }
        Command::Analyse { experiment, json } => {
            analyse::execute(&probe_config, experiment, json)?;
        }
        Command::Report { experiment, json } => {
            report::execute(&probe_config, experiment, json)?;
        }
        Command::Score { target, candidates, ignore_empty, json } => {
            score::execute(&probe_config, &target, &candidates, ignore_empty, json)?;
        }
    }

    Ok(())
}
