//! Scores stored examples and summarizes every (condition, variant) group.

use crate::condition::{Condition, ModelVariant};
use crate::error::{EvalError, EvalResult};
use crate::record::EvaluationRecord;
use crate::results::{ConditionExamples, ExperimentResults, TestResults, TestSummary};
use probe_scoring::{aggregate, score_examples, ConditionSummary, PrefixScorer, TargetPair};
use serde::Serialize;
use tracing::info;

/// Consumes a results document and returns a new one whose examples carry
/// `p_<field>_first` and whose `test_summary` holds one summary per group.
///
/// Any earlier `p_*` values and summary are replaced.
pub fn analyse(
    results: ExperimentResults,
    targets: &TargetPair,
    scorer: &PrefixScorer,
) -> EvalResult<ExperimentResults> {
    let Some(test) = results.test else {
        return Err(EvalError::NoTestResults(results.experiment_id));
    };

    let mut enriched = TestResults::new();
    let mut summary = TestSummary::new();

    for (condition, variants) in test {
        for (variant, group) in variants {
            let ConditionExamples { model_id, examples } = group;
            let scored = score_examples(examples, targets, scorer)?;
            let group_summary = aggregate(&scored);
            info!(
                condition = %condition,
                variant = %variant,
                examples = scored.len(),
                first_mean = group_summary.first.mean,
                second_mean = group_summary.second.mean,
                "group analysed"
            );

            let scored_targets = scored.targets().clone();
            let examples =
                scored.into_examples().into_iter().map(|s| EvaluationRecord::from_scored(s, &scored_targets)).collect();
            enriched.entry(condition).or_default().insert(variant, ConditionExamples { model_id, examples });
            summary.entry(condition).or_default().insert(variant, group_summary);
        }
    }

    Ok(ExperimentResults { test: Some(enriched), test_summary: Some(summary), ..results })
}

/// Trained-minus-baseline change in one field's mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDelta {
    pub field: String,
    pub baseline: f64,
    pub trained: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionComparison {
    pub condition: Condition,
    pub first: FieldDelta,
    pub second: FieldDelta,
}

/// Compares the variants of every condition that has both.
pub fn compare(summary: &TestSummary) -> Vec<ConditionComparison> {
    summary
        .iter()
        .filter_map(|(condition, variants)| {
            let baseline = variants.get(&ModelVariant::Baseline)?;
            let trained = variants.get(&ModelVariant::Trained)?;
            Some(ConditionComparison {
                condition: *condition,
                first: field_delta(&baseline.first, &trained.first),
                second: field_delta(&baseline.second, &trained.second),
            })
        })
        .collect()
}

fn field_delta(baseline: &probe_scoring::FieldSummary, trained: &probe_scoring::FieldSummary) -> FieldDelta {
    FieldDelta {
        field: baseline.field.clone(),
        baseline: baseline.mean,
        trained: trained.mean,
        delta: trained.mean - baseline.mean,
    }
}

/// Group summaries in canonical condition order, flattened for reporting.
pub fn summary_rows(summary: &TestSummary) -> Vec<(Condition, ModelVariant, &ConditionSummary)> {
    summary
        .iter()
        .flat_map(|(condition, variants)| variants.iter().map(move |(variant, s)| (*condition, *variant, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ExperimentId;
    use probe_abstraction::ChatMessage;
    use probe_scoring::{Candidate, EmptyTokenPolicy, ScoringError};

    fn record(country: &str, capital: &str, top5: &[(&str, f64)]) -> EvaluationRecord {
        let mut metadata = serde_json::Map::new();
        metadata.insert("country".to_string(), serde_json::json!(country));
        metadata.insert("capital".to_string(), serde_json::json!(capital));
        EvaluationRecord {
            metadata,
            messages: vec![ChatMessage::user("?")],
            top5: top5.iter().map(|(t, p)| Candidate::new(*t, *p)).collect(),
        }
    }

    fn results() -> ExperimentResults {
        let mut results = ExperimentResults::new(ExperimentId(4));
        let condition = Condition::ALL[0];
        results.record_group(
            condition,
            ModelVariant::Baseline,
            "nano",
            vec![
                record("United Kingdom", "London", &[("Un", 0.1), ("United", 0.2), (" united", 0.05), ("King", 0.4)]),
                record("Peru", "Lima", &[("Li", 0.3), (" ", 0.1)]),
            ],
        );
        results.record_group(
            condition,
            ModelVariant::Trained,
            "ft:nano",
            vec![record("Peru", "Lima", &[("Per", 0.9), ("Lim", 0.05)])],
        );
        results.record_group(Condition::ALL[3], ModelVariant::Baseline, "nano", vec![]);
        results
    }

    #[test]
    fn test_analyse_enriches_and_summarizes() {
        let targets = TargetPair::default();
        let analysed = analyse(results(), &targets, &PrefixScorer::default()).unwrap();

        let baseline = analysed.group(Condition::ALL[0], ModelVariant::Baseline).unwrap();
        assert_eq!(baseline.model_id.as_deref(), Some("nano"));
        assert!((baseline.examples[0].probability("country").unwrap() - 0.35).abs() < 1e-12);
        assert_eq!(baseline.examples[0].probability("capital"), Some(0.0));
        assert!((baseline.examples[1].probability("country").unwrap() - 0.1).abs() < 1e-12);
        assert!((baseline.examples[1].probability("capital").unwrap() - 0.4).abs() < 1e-12);

        let summary = analysed.test_summary.as_ref().unwrap();
        let group = &summary[&Condition::ALL[0]][&ModelVariant::Baseline];
        assert!((group.first.mean - 0.225).abs() < 1e-12);
        assert!((group.first.standard_error - 0.125).abs() < 1e-12);

        let empty = &summary[&Condition::ALL[3]][&ModelVariant::Baseline];
        assert_eq!(*empty, ConditionSummary::empty(&targets));
    }

    #[test]
    fn test_analyse_respects_empty_token_policy() {
        let analysed =
            analyse(results(), &TargetPair::default(), &PrefixScorer::new(EmptyTokenPolicy::Ignore)).unwrap();
        let baseline = analysed.group(Condition::ALL[0], ModelVariant::Baseline).unwrap();
        assert_eq!(baseline.examples[1].probability("country"), Some(0.0));
    }

    #[test]
    fn test_analyse_is_repeatable() {
        let targets = TargetPair::default();
        let once = analyse(results(), &targets, &PrefixScorer::default()).unwrap();
        let twice = analyse(once.clone(), &targets, &PrefixScorer::default()).unwrap();
        assert_eq!(once.test_summary, twice.test_summary);
        assert_eq!(once.test, twice.test);
    }

    #[test]
    fn test_analyse_requires_test_section() {
        let err = analyse(ExperimentResults::new(ExperimentId(2)), &TargetPair::default(), &PrefixScorer::default())
            .unwrap_err();
        assert!(matches!(err, EvalError::NoTestResults(ExperimentId(2))));
    }

    #[test]
    fn test_analyse_propagates_invalid_probability() {
        let mut results = ExperimentResults::new(ExperimentId(5));
        results.record_group(
            Condition::ALL[1],
            ModelVariant::Trained,
            "ft:nano",
            vec![record("Peru", "Lima", &[("Pe", 1.2)])],
        );
        let err = analyse(results, &TargetPair::default(), &PrefixScorer::default()).unwrap_err();
        assert!(matches!(err, EvalError::Scoring(ScoringError::InvalidProbability { .. })));
    }

    #[test]
    fn test_compare_needs_both_variants() {
        let analysed = analyse(results(), &TargetPair::default(), &PrefixScorer::default()).unwrap();
        let summary = analysed.test_summary.unwrap();

        let comparisons = compare(&summary);
        assert_eq!(comparisons.len(), 1);
        let c = &comparisons[0];
        assert_eq!(c.condition, Condition::ALL[0]);
        assert_eq!(c.first.field, "country");
        assert!((c.first.delta - (0.9 - 0.225)).abs() < 1e-12);

        let rows = summary_rows(&summary);
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].0, rows[0].1), (Condition::ALL[0], ModelVariant::Baseline));
        assert_eq!(rows[2].0, Condition::ALL[3]);
    }
}
