//! Design-weighted prevalence estimation.
//!
//! This module implements the estimator at the heart of the crate: weighted
//! prevalence with a Kish effective sample size, normal-approximation
//! standard errors, relative standard errors, and clamped confidence
//! intervals. Estimates are always derived from a [`WeightedTally`], never
//! recomputed from other estimates, so aggregated cells stay exact.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported two-sided confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Percent90,
    Percent95,
    Percent99,
}

impl ConfidenceLevel {
    /// Parses a percent value (90, 95, or 99).
    pub fn from_percent(percent: u8) -> Option<Self> {
        match percent {
            90 => Some(ConfidenceLevel::Percent90),
            95 => Some(ConfidenceLevel::Percent95),
            99 => Some(ConfidenceLevel::Percent99),
            _ => None,
        }
    }

    /// The percent value of this level.
    pub fn percent(&self) -> u8 {
        match self {
            ConfidenceLevel::Percent90 => 90,
            ConfidenceLevel::Percent95 => 95,
            ConfidenceLevel::Percent99 => 99,
        }
    }

    /// Two-sided normal critical value for this level.
    pub fn z(&self) -> f64 {
        match self {
            ConfidenceLevel::Percent90 => 1.645,
            ConfidenceLevel::Percent95 => 1.96,
            ConfidenceLevel::Percent99 => 2.576,
        }
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        ConfidenceLevel::Percent95
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Streaming accumulator for one analysis cell.
///
/// Tallies are associative: absorbing the tally of a disjoint row set gives
/// the same result as observing those rows directly. Cells for merged strata
/// are therefore built by combining tallies, never by averaging estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedTally {
    /// Unweighted respondent count.
    pub respondents: usize,
    /// Sum of sampling weights.
    pub weight_sum: f64,
    /// Sum of squared sampling weights.
    pub weight_sq_sum: f64,
    /// Sum of weights over respondents with the outcome.
    pub case_weight_sum: f64,
}

impl WeightedTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one respondent with the given weight and outcome.
    pub fn observe(&mut self, weight: f64, is_case: bool) {
        self.respondents += 1;
        self.weight_sum += weight;
        self.weight_sq_sum += weight * weight;
        if is_case {
            self.case_weight_sum += weight;
        }
    }

    /// Merges another tally into this one.
    pub fn absorb(&mut self, other: &WeightedTally) {
        self.respondents += other.respondents;
        self.weight_sum += other.weight_sum;
        self.weight_sq_sum += other.weight_sq_sum;
        self.case_weight_sum += other.case_weight_sum;
    }

    /// True when no respondents were observed.
    pub fn is_empty(&self) -> bool {
        self.respondents == 0
    }

    /// Kish effective sample size: (Σw)² / Σw².
    ///
    /// Zero when no weight has been observed.
    pub fn effective_n(&self) -> f64 {
        if self.weight_sq_sum > 0.0 {
            (self.weight_sum * self.weight_sum) / self.weight_sq_sum
        } else {
            0.0
        }
    }

    /// Weighted proportion without any uncertainty bookkeeping.
    ///
    /// Zero-weight cells report 0.0, matching the descriptive tables where
    /// a prevalence column is always numeric.
    pub fn proportion(&self) -> f64 {
        if self.weight_sum > 0.0 {
            self.case_weight_sum / self.weight_sum
        } else {
            0.0
        }
    }

    /// Derives the full prevalence estimate at the given confidence level.
    pub fn estimate(&self, level: ConfidenceLevel) -> PrevalenceEstimate {
        if self.weight_sum <= 0.0 {
            return PrevalenceEstimate {
                prevalence: None,
                respondents: self.respondents,
                weight_sum: self.weight_sum,
                effective_n: 0.0,
                std_error: None,
                rse_pct: None,
                interval: None,
            };
        }

        let prevalence = self.case_weight_sum / self.weight_sum;
        let effective_n = self.effective_n();

        // The interval is undefined without an effective sample or when a
        // degenerate weight mix pushes the point estimate outside [0, 1].
        let (std_error, interval) = if effective_n > 0.0 && (0.0..=1.0).contains(&prevalence) {
            let clamped = prevalence.clamp(0.0, 1.0);
            let se = (clamped * (1.0 - clamped) / effective_n).sqrt();
            let margin = level.z() * se;
            let ci = ConfidenceInterval {
                lower: (prevalence - margin).max(0.0),
                upper: (prevalence + margin).min(1.0),
            };
            (Some(se), Some(ci))
        } else {
            (None, None)
        };

        // RSE is only meaningful strictly inside the unit interval.
        let rse_pct = match std_error {
            Some(se) if prevalence > 0.0 && prevalence < 1.0 => Some(se / prevalence * 100.0),
            _ => None,
        };

        PrevalenceEstimate {
            prevalence: Some(prevalence),
            respondents: self.respondents,
            weight_sum: self.weight_sum,
            effective_n,
            std_error,
            rse_pct,
            interval,
        }
    }
}

/// Two-sided confidence interval clamped to the unit interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// A design-weighted prevalence estimate for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrevalenceEstimate {
    /// Weighted prevalence as a proportion. `None` for zero-weight cells.
    pub prevalence: Option<f64>,
    /// Unweighted respondent count behind the estimate.
    pub respondents: usize,
    /// Sum of sampling weights behind the estimate.
    pub weight_sum: f64,
    /// Kish effective sample size.
    pub effective_n: f64,
    /// Standard error of the proportion, where defined.
    pub std_error: Option<f64>,
    /// Relative standard error in percent, where defined.
    pub rse_pct: Option<f64>,
    /// Confidence interval, where defined.
    pub interval: Option<ConfidenceInterval>,
}

impl PrevalenceEstimate {
    /// Prevalence in percent, where defined.
    pub fn prevalence_pct(&self) -> Option<f64> {
        self.prevalence.map(|p| p * 100.0)
    }

    /// Table cell text: `"23.4% (21.0% - 25.8%)"`.
    ///
    /// Cells without a point estimate render as `"N/A"`; cells whose
    /// interval is undefined render as `"23.4% (N/A)"`.
    pub fn display_with_interval(&self) -> String {
        match (self.prevalence, self.interval) {
            (None, _) => "N/A".to_string(),
            (Some(p), None) => format!("{:.1}% (N/A)", p * 100.0),
            (Some(p), Some(ci)) => format!(
                "{:.1}% ({:.1}% - {:.1}%)",
                p * 100.0,
                ci.lower * 100.0,
                ci.upper * 100.0
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_equal_weights_match_unweighted() {
        let mut tally = WeightedTally::new();
        for i in 0..100 {
            tally.observe(1.0, i < 30);
        }
        let est = tally.estimate(ConfidenceLevel::Percent95);

        assert_eq!(est.respondents, 100);
        assert!(close(est.prevalence.unwrap(), 0.3));
        // Equal weights leave the effective n at the raw n.
        assert!(close(est.effective_n, 100.0));

        let se = (0.3_f64 * 0.7 / 100.0).sqrt();
        assert!(close(est.std_error.unwrap(), se));
        let ci = est.interval.unwrap();
        assert!(close(ci.lower, 0.3 - 1.96 * se));
        assert!(close(ci.upper, 0.3 + 1.96 * se));
        assert!(close(est.rse_pct.unwrap(), se / 0.3 * 100.0));
    }

    #[test]
    fn test_effective_n_shrinks_with_unequal_weights() {
        let mut tally = WeightedTally::new();
        tally.observe(1.0, false);
        tally.observe(3.0, true);
        // (1 + 3)^2 / (1 + 9) = 1.6
        assert!(close(tally.effective_n(), 1.6));
        assert!(close(tally.estimate(ConfidenceLevel::Percent95).prevalence.unwrap(), 0.75));
    }

    #[test]
    fn test_absorb_equals_direct_observation() {
        let weights = [2.5, 1.0, 0.5, 4.0, 1.5, 3.0];
        let cases = [true, false, true, false, false, true];

        let mut whole = WeightedTally::new();
        for (w, c) in weights.iter().zip(cases.iter()) {
            whole.observe(*w, *c);
        }

        let mut left = WeightedTally::new();
        let mut right = WeightedTally::new();
        for (i, (w, c)) in weights.iter().zip(cases.iter()).enumerate() {
            if i % 2 == 0 {
                left.observe(*w, *c);
            } else {
                right.observe(*w, *c);
            }
        }
        let mut merged = left;
        merged.absorb(&right);

        assert_eq!(merged.respondents, whole.respondents);
        assert!(close(merged.weight_sum, whole.weight_sum));
        assert!(close(merged.weight_sq_sum, whole.weight_sq_sum));
        assert!(close(merged.case_weight_sum, whole.case_weight_sum));
        assert_eq!(
            merged.estimate(ConfidenceLevel::Percent95),
            whole.estimate(ConfidenceLevel::Percent95)
        );
    }

    #[test]
    fn test_zero_weight_cell_has_no_estimate() {
        let tally = WeightedTally::new();
        let est = tally.estimate(ConfidenceLevel::Percent95);
        assert_eq!(est.prevalence, None);
        assert_eq!(est.effective_n, 0.0);
        assert_eq!(est.std_error, None);
        assert_eq!(est.rse_pct, None);
        assert_eq!(est.interval, None);
        assert_eq!(est.display_with_interval(), "N/A");
    }

    #[test]
    fn test_degenerate_proportions_have_no_rse() {
        let mut all_cases = WeightedTally::new();
        for _ in 0..60 {
            all_cases.observe(2.0, true);
        }
        let est = all_cases.estimate(ConfidenceLevel::Percent95);
        assert!(close(est.prevalence.unwrap(), 1.0));
        // SE collapses to zero but RSE stays undefined at p = 1.
        assert!(close(est.std_error.unwrap(), 0.0));
        assert_eq!(est.rse_pct, None);
        let ci = est.interval.unwrap();
        assert!(close(ci.lower, 1.0));
        assert!(close(ci.upper, 1.0));

        let mut no_cases = WeightedTally::new();
        for _ in 0..60 {
            no_cases.observe(2.0, false);
        }
        assert_eq!(no_cases.estimate(ConfidenceLevel::Percent95).rse_pct, None);
    }

    #[test]
    fn test_interval_clamps_to_unit_range() {
        let mut tally = WeightedTally::new();
        tally.observe(1.0, true);
        tally.observe(1.0, false);
        tally.observe(1.0, false);
        tally.observe(1.0, false);
        // p = 0.25 on n_eff = 4 puts the lower bound below zero before clamping.
        let ci = tally.estimate(ConfidenceLevel::Percent95).interval.unwrap();
        assert_eq!(ci.lower, 0.0);
        assert!(ci.upper < 1.0);
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_percent(90), Some(ConfidenceLevel::Percent90));
        assert_eq!(ConfidenceLevel::from_percent(95), Some(ConfidenceLevel::Percent95));
        assert_eq!(ConfidenceLevel::from_percent(99), Some(ConfidenceLevel::Percent99));
        assert_eq!(ConfidenceLevel::from_percent(80), None);
        assert!(close(ConfidenceLevel::default().z(), 1.96));

        let mut tally = WeightedTally::new();
        for i in 0..100 {
            tally.observe(1.0, i < 50);
        }
        let narrow = tally.estimate(ConfidenceLevel::Percent90).interval.unwrap();
        let wide = tally.estimate(ConfidenceLevel::Percent99).interval.unwrap();
        assert!(narrow.upper - narrow.lower < wide.upper - wide.lower);
    }

    #[test]
    fn test_display_formatting() {
        let mut tally = WeightedTally::new();
        for i in 0..200 {
            tally.observe(1.0, i < 47);
        }
        let est = tally.estimate(ConfidenceLevel::Percent95);
        let text = est.display_with_interval();
        assert!(text.starts_with("23.5% ("));
        assert!(text.contains(" - "));
        assert!(text.ends_with("%)"));
    }

    #[test]
    fn test_proportion_of_zero_weight_is_zero() {
        assert_eq!(WeightedTally::new().proportion(), 0.0);
        let mut tally = WeightedTally::new();
        tally.observe(2.0, true);
        tally.observe(2.0, false);
        assert!(close(tally.proportion(), 0.5));
    }
}
