//! Score command implementation.

use anyhow::{Context, Result};
use probe_eval::ProbeConfig;
use probe_scoring::{parse_candidates, EmptyTokenPolicy, PrefixScorer};
use serde_json::json;

pub fn execute(
    config: &ProbeConfig,
    target: &str,
    candidates: &str,
    ignore_empty: bool,
    json_output: bool,
) -> Result<()> {
    let candidates = parse_candidates(candidates).context("Failed to parse --candidates")?;
    let policy = if ignore_empty { EmptyTokenPolicy::Ignore } else { config.empty_token_policy };
    let probability = PrefixScorer::new(policy).score(&candidates, target)?;

    if json_output {
        let out = json!({
            "target": target,
            "probability": probability,
            "candidates": candidates.len(),
            "empty_token_policy": policy,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{probability:.6}");
    }
    Ok(())
}
