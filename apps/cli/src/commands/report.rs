//! Report command implementation.

use super::results_store;
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use probe_eval::{compare, summary_rows, ExperimentId, ProbeConfig, TestSummary};
use serde_json::json;

pub fn execute(config: &ProbeConfig, experiment: ExperimentId, json_output: bool) -> Result<()> {
    let results = results_store(config)
        .load(experiment)
        .with_context(|| format!("Failed to load experiment {experiment}"))?;

    let summary = results.test_summary.as_ref().with_context(|| {
        format!("Experiment {experiment} has not been analysed. Run `probe analyse --experiment {experiment}` first.")
    })?;

    if json_output {
        let out = json!({
            "experiment_id": results.experiment_id,
            "trained_model": results.trained_model_id(),
            "test_summary": summary,
            "comparison": compare(summary),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_summary(experiment, summary);
    Ok(())
}

/// Prints the per-group summary table followed by the trained-vs-baseline deltas.
pub fn print_summary(experiment: ExperimentId, summary: &TestSummary) {
    let rows = summary_rows(summary);

    println!();
    println!("{}", format!("Experiment {experiment} summary").bold().cyan());
    println!();

    let Some((_, _, first_row)) = rows.first() else {
        println!("  {}", "No evaluated groups.".dimmed());
        println!();
        return;
    };
    let first_field = first_row.first.field.clone();
    let second_field = first_row.second.field.clone();

    let mut table = Table::new();
    table.set_header(vec![
        "Condition".to_string(),
        "Variant".to_string(),
        format!("P({first_field})"),
        format!("P({second_field})"),
    ]);
    for (condition, variant, s) in &rows {
        table.add_row(vec![
            Cell::new(condition.key()),
            Cell::new(variant.as_str()).fg(Color::Cyan),
            Cell::new(format!("{:.4} ± {:.4}", s.first.mean, s.first.standard_error)),
            Cell::new(format!("{:.4} ± {:.4}", s.second.mean, s.second.standard_error)),
        ]);
    }
    println!("{table}");

    let comparisons = compare(summary);
    if !comparisons.is_empty() {
        println!();
        println!("{}", "Trained - baseline".bold());
        for c in comparisons {
            println!(
                "  {:<36} {}: {}  {}: {}",
                c.condition.key(),
                c.first.field,
                colored_delta(c.first.delta),
                c.second.field,
                colored_delta(c.second.delta)
            );
        }
    }
    println!();
}

fn colored_delta(delta: f64) -> String {
    let text = format!("{delta:+.4}");
    if delta > 0.0 {
        text.green().to_string()
    } else if delta < 0.0 {
        text.red().to_string()
    } else {
        text.dimmed().to_string()
    }
}
