//! Property-style checks of the prefix scorer over a fixed corpus of
//! realistic top-5 lists.

use probe_scoring::{
    aggregate, score_examples, token_prefix_probability, Candidate, EmptyTokenPolicy, PrefixScorer,
    ScoringRecord, ScoringResult, TargetPair,
};

fn corpus() -> Vec<(Vec<Candidate>, &'static str)> {
    let list = |items: &[(&str, f64)]| items.iter().map(|(t, p)| Candidate::new(*t, *p)).collect::<Vec<_>>();
    vec![
        (list(&[("Un", 0.10), ("United", 0.20), (" united", 0.05), ("King", 0.40), ("UK", 0.25)]), "United Kingdom"),
        (list(&[(" L", 0.10), ("Lon", 0.15), ("london", 0.05), ("Paris", 0.40), (",", 0.30)]), "London"),
        (list(&[("A", 0.5), ("B", 0.5), (" ", 0.0), ("C", 0.0), ("D", 0.0)]), "Zed"),
        (list(&[("Ul", 0.61), ("U", 0.2), ("Mongolia", 0.1), (" ", 0.04), ("ulan", 0.02)]), "Ulaanbaatar"),
        (list(&[("S", 0.3), ("São", 0.5), ("são", 0.1), ("Rio", 0.05), ("Bras", 0.03)]), "São Tomé and Príncipe"),
        (list(&[]), "Lima"),
    ]
}

fn flip_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<String>()
            } else {
                c.to_uppercase().collect::<String>()
            }
        })
        .collect()
}

#[test]
fn test_score_is_bounded_by_total_mass() {
    for policy in [EmptyTokenPolicy::Match, EmptyTokenPolicy::Ignore] {
        let scorer = PrefixScorer::new(policy);
        for (candidates, target) in corpus() {
            let p = scorer.score(&candidates, target).unwrap();
            let total: f64 = candidates.iter().map(|c| c.prob).sum();
            assert!(p >= 0.0, "{target}: {p} < 0");
            assert!(p <= total + 1e-12, "{target}: {p} > {total}");
        }
    }
}

#[test]
fn test_case_flip_invariance() {
    for (candidates, target) in corpus() {
        let flipped: Vec<Candidate> =
            candidates.iter().map(|c| Candidate::new(flip_case(&c.token), c.prob)).collect();
        let a = token_prefix_probability(&candidates, target).unwrap();
        let b = token_prefix_probability(&flipped, &flip_case(target)).unwrap();
        assert!((a - b).abs() < 1e-12, "{target}: {a} != {b}");
    }
}

#[test]
fn test_single_leading_space_invariance() {
    for (candidates, target) in corpus() {
        let spaced: Vec<Candidate> =
            candidates.iter().map(|c| Candidate::new(format!(" {}", c.token), c.prob)).collect();
        let trimmed: Vec<Candidate> = candidates
            .iter()
            .map(|c| Candidate::new(c.token.strip_prefix(' ').unwrap_or(&c.token), c.prob))
            .collect();

        let base = token_prefix_probability(&candidates, target).unwrap();
        assert!((base - token_prefix_probability(&spaced, target).unwrap()).abs() < 1e-12);
        assert!((base - token_prefix_probability(&trimmed, target).unwrap()).abs() < 1e-12);
    }
}

#[test]
fn test_repeat_runs_are_bit_identical() {
    struct Row {
        country: String,
        capital: String,
        top5: Vec<Candidate>,
    }

    impl ScoringRecord for Row {
        fn candidates(&self) -> &[Candidate] {
            &self.top5
        }

        fn target(&self, field: &str) -> ScoringResult<&str> {
            Ok(match field {
                "country" => self.country.as_str(),
                "capital" => self.capital.as_str(),
                _ => "",
            })
        }
    }

    let rows = || {
        corpus().into_iter().map(|(top5, target)| Row {
            country: target.to_string(),
            capital: target.chars().rev().collect(),
            top5,
        })
    };

    let targets = TargetPair::default();
    let scorer = PrefixScorer::default();
    let first = aggregate(&score_examples(rows(), &targets, &scorer).unwrap());
    let second = aggregate(&score_examples(rows(), &targets, &scorer).unwrap());

    assert_eq!(first.first.mean.to_bits(), second.first.mean.to_bits());
    assert_eq!(first.first.standard_error.to_bits(), second.first.standard_error.to_bits());
    assert_eq!(first.second.mean.to_bits(), second.second.mean.to_bits());
    assert_eq!(first.second.standard_error.to_bits(), second.second.standard_error.to_bits());
}
