//! Weighted scoring of check outcomes.
//!
//! Each check contributes its weight only when it evaluated to `true`;
//! failed and not-applicable checks both contribute zero. With the default
//! weights a source without a URL can reach at most 60 points, exactly the
//! pass cutoff.

use serde::Deserialize;

use crate::checks::DEFAULT_RECENCY_YEARS;
use crate::models::ValidationChecks;

/// Weights, pass cutoff, and recency threshold used to score a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub url_weight: u32,
    pub format_weight: u32,
    pub domain_weight: u32,
    pub recency_weight: u32,
    pub fields_weight: u32,
    pub pass_cutoff: u32,
    pub recency_years: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            url_weight: 20,
            format_weight: 30,
            domain_weight: 20,
            recency_weight: 10,
            fields_weight: 20,
            pass_cutoff: 60,
            recency_years: DEFAULT_RECENCY_YEARS,
        }
    }
}

impl ScoringConfig {
    /// Sum of all five weights; the highest score a source can reach.
    ///
    /// Summed in `u64` so oversized weights cannot wrap.
    pub fn max_score(&self) -> u64 {
        [
            self.url_weight,
            self.format_weight,
            self.domain_weight,
            self.recency_weight,
            self.fields_weight,
        ]
        .iter()
        .map(|w| u64::from(*w))
        .sum()
    }

    /// Computes the score for a set of check outcomes.
    pub fn score(&self, checks: &ValidationChecks) -> u32 {
        let mut score = 0;
        if checks.url_accessible.is_passed() {
            score += self.url_weight;
        }
        if checks.format_correct {
            score += self.format_weight;
        }
        if checks.credible_domain.is_passed() {
            score += self.domain_weight;
        }
        if checks.is_recent.is_passed() {
            score += self.recency_weight;
        }
        if checks.has_required_fields {
            score += self.fields_weight;
        }
        score
    }

    /// Pass/fail verdict for a score.
    pub fn is_valid(&self, score: u32) -> bool {
        score >= self.pass_cutoff
    }

    /// Score and verdict together.
    pub fn evaluate(&self, checks: &ValidationChecks) -> (u32, bool) {
        let score = self.score(checks);
        (score, self.is_valid(score))
    }
}
