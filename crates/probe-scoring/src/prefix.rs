//! First-token prefix scoring.
//!
//! A model answering "United Kingdom" may start with `"Un"`, `"United"` or
//! `" united"` depending on tokenization. Each of those is evidence for the same
//! answer, so the score of a target is the summed probability of every candidate
//! whose normalized token is a prefix of the normalized target.

use crate::candidate::Candidate;
use crate::error::ScoringResult;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// What to do with candidates whose token normalizes to the empty string
/// (e.g. `" "`), which is trivially a prefix of every target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTokenPolicy {
    /// Literal prefix semantics: empty tokens match every target.
    #[default]
    Match,
    /// Empty tokens never match.
    Ignore,
}

impl std::str::FromStr for EmptyTokenPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(Self::Match),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown empty token policy '{other}' (expected match or ignore)")),
        }
    }
}

/// Strips leading whitespace and lower-cases.
pub fn normalize(text: &str) -> String {
    text.trim_start().to_lowercase()
}

/// Scores candidate lists against target strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixScorer {
    policy: EmptyTokenPolicy,
}

impl PrefixScorer {
    #[must_use]
    pub const fn new(policy: EmptyTokenPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> EmptyTokenPolicy {
        self.policy
    }

    /// Total probability of the candidates consistent with `target`.
    ///
    /// Every candidate is validated, matching or not; the first invalid
    /// probability aborts scoring. Probabilities are not assumed to sum to 1.
    pub fn score(&self, candidates: &[Candidate], target: &str) -> ScoringResult<f64> {
        let target = normalize(target);
        let mut total = 0.0;

        for (index, candidate) in candidates.iter().enumerate() {
            candidate.validate(index)?;

            let token = normalize(&candidate.token);
            if token.is_empty() {
                if self.policy == EmptyTokenPolicy::Ignore {
                    continue;
                }
                trace!(index, raw = %candidate.token, "empty token counted as prefix match");
            }

            if target.starts_with(token.as_str()) {
                total += candidate.prob;
            }
        }

        Ok(total)
    }
}

/// Scores with the default (literal) empty-token policy.
pub fn token_prefix_probability(candidates: &[Candidate], target: &str) -> ScoringResult<f64> {
    PrefixScorer::default().score(candidates, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;

    fn candidates(items: &[(&str, f64)]) -> Vec<Candidate> {
        items.iter().map(|(token, prob)| Candidate::new(*token, *prob)).collect()
    }

    #[test]
    fn test_country_variants_sum() {
        let top5 = candidates(&[
            ("Un", 0.10),
            ("United", 0.20),
            (" united", 0.05),
            ("King", 0.40),
            ("UK", 0.25),
        ]);
        let p = token_prefix_probability(&top5, "United Kingdom").unwrap();
        assert!((p - (0.10 + 0.20 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_capital_variants_sum() {
        let top5 = candidates(&[
            (" L", 0.10),
            ("Lon", 0.15),
            ("london", 0.05),
            ("Paris", 0.40),
            (",", 0.30),
        ]);
        let p = token_prefix_probability(&top5, "London").unwrap();
        assert!((p - (0.10 + 0.15 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_no_matches_is_zero() {
        let top5 = candidates(&[("A", 0.5), ("B", 0.5), (" ", 0.0), ("C", 0.0), ("D", 0.0)]);
        let p = token_prefix_probability(&top5, "Zed").unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_longer_token_never_matches() {
        let top5 = candidates(&[("Londoner", 0.6), ("London", 0.3)]);
        let p = token_prefix_probability(&top5, "London").unwrap();
        assert!((p - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_target_leading_whitespace_and_case() {
        let top5 = candidates(&[("par", 0.7)]);
        let p = token_prefix_probability(&top5, "  PARIS").unwrap();
        assert!((p - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_empty_candidate_list() {
        assert_eq!(token_prefix_probability(&[], "Lima").unwrap(), 0.0);
    }

    #[test]
    fn test_empty_token_policy() {
        let top5 = candidates(&[(" ", 0.2), ("Li", 0.5), ("", 0.1)]);

        let literal = PrefixScorer::new(EmptyTokenPolicy::Match).score(&top5, "Lima").unwrap();
        assert!((literal - 0.8).abs() < 1e-12);

        let ignoring = PrefixScorer::new(EmptyTokenPolicy::Ignore).score(&top5, "Lima").unwrap();
        assert!((ignoring - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_target_only_matches_empty_tokens() {
        let top5 = candidates(&[(" ", 0.2), ("Li", 0.5)]);
        let p = token_prefix_probability(&top5, "").unwrap();
        assert!((p - 0.2).abs() < 1e-12);

        let p = PrefixScorer::new(EmptyTokenPolicy::Ignore).score(&top5, "").unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_negative_probability_fails_even_when_not_matching() {
        let top5 = candidates(&[("Li", 0.5), ("Zz", -0.1)]);
        let err = token_prefix_probability(&top5, "Lima").unwrap_err();
        assert!(matches!(err, ScoringError::InvalidProbability { index: 1, .. }));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("match".parse::<EmptyTokenPolicy>().unwrap(), EmptyTokenPolicy::Match);
        assert_eq!("ignore".parse::<EmptyTokenPolicy>().unwrap(), EmptyTokenPolicy::Ignore);
        assert!("skip".parse::<EmptyTokenPolicy>().is_err());
    }
}
