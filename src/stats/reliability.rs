//! Reliability screening for small-sample estimates.

use crate::stats::estimator::PrevalenceEstimate;
use serde::{Deserialize, Serialize};

/// Suppression thresholds applied before an estimate is mapped or listed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityPolicy {
    /// Minimum unweighted respondents per cell.
    pub min_respondents: usize,
    /// Maximum relative standard error, in percent.
    pub max_rse_pct: f64,
}

impl Default for ReliabilityPolicy {
    fn default() -> Self {
        // Standard BRFSS presentation rule: n >= 50 and RSE <= 30%.
        Self {
            min_respondents: 50,
            max_rse_pct: 30.0,
        }
    }
}

impl ReliabilityPolicy {
    /// Whether an estimate is stable enough to present.
    ///
    /// An undefined RSE does not suppress on its own: cells at exactly 0% or
    /// 100% prevalence pass the RSE check and are screened by the respondent
    /// floor alone.
    pub fn is_reliable(&self, estimate: &PrevalenceEstimate) -> bool {
        if estimate.respondents < self.min_respondents {
            return false;
        }
        match estimate.rse_pct {
            Some(rse) => rse <= self.max_rse_pct,
            None => true,
        }
    }

    /// Prevalence for presentation: `None` when the estimate is suppressed.
    pub fn screened_prevalence(&self, estimate: &PrevalenceEstimate) -> Option<f64> {
        if self.is_reliable(estimate) {
            estimate.prevalence
        } else {
            None
        }
    }
}
