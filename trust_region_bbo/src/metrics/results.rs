//! Per-round results accumulation.
//!
//! Every round appends to named series. On flush the accumulated series are
//! handed to a [`MetricsRecorder`](super::MetricsRecorder) as a
//! [`ResultsSnapshot`] and the accumulator starts over.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BboError, Result};

/// Metric names written by the minimizer.
pub mod keys {
    /// Real-coordinate exploration points, one row per sample.
    pub const EXPLORE_POLICIES: &str = "explore_policies";
    /// Objective values of the exploration points.
    pub const REWARDS: &str = "rewards";
    /// Real-coordinate policy after each step.
    pub const POLICIES: &str = "policies";
    /// Uncounted objective value of the policy after each step.
    pub const REWARD_PI_EVALUATE: &str = "reward_pi_evaluate";
    /// Frame at which each policy evaluation happened.
    pub const FRAME_PI_EVALUATE: &str = "frame_pi_evaluate";
    pub const VALUE_LOSS: &str = "value_loss";
    pub const DERIVATIVE_LOSS: &str = "derivative_loss";

    // Per-flush summaries.
    pub const FRAME: &str = "frame";
    pub const BEST_OBSERVED: &str = "best_observed";
    pub const BEST_PI_EVALUATE: &str = "best_pi_evaluate";
    pub const GRAD: &str = "grad";
    pub const DIST_X: &str = "dist_x";
    pub const IN_TRUST: &str = "in_trust";
    pub const DIST_F: &str = "dist_f";
    pub const GRAD_NORM: &str = "grad_norm";
    pub const VALUE: &str = "value";
    pub const MEAN_GRAD: &str = "mean_grad";
    pub const DIVERGENCE: &str = "divergence";
    pub const R_NORM_MEAN: &str = "r_norm_mean";
    pub const R_NORM_SIGMA: &str = "r_norm_sigma";
    pub const MIN_TRUST_SIGMA: &str = "min_trust_sigma";
    pub const NO_CHANGE: &str = "no_change";
    pub const EPSILON: &str = "epsilon";
    /// Objective value of the initial policy.
    pub const F0: &str = "f0";
}

/// A metric time series: scalars or fixed-width rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Scalars(Vec<f64>),
    Rows(Vec<Vec<f32>>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Scalars(v) => v.len(),
            Series::Rows(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Series::Scalars(_) => "scalars",
            Series::Rows(_) => "rows",
        }
    }

    /// Concatenate `other` onto this series. Kinds must agree.
    pub fn append(&mut self, key: &str, other: &Series) -> Result<()> {
        match (self, other) {
            (Series::Scalars(a), Series::Scalars(b)) => a.extend_from_slice(b),
            (Series::Rows(a), Series::Rows(b)) => a.extend(b.iter().cloned()),
            (this, other) => {
                return Err(BboError::CorruptMetrics {
                    key: key.to_string(),
                    message: format!("cannot append {} onto {}", other.kind(), this.kind()),
                })
            }
        }
        Ok(())
    }

    pub fn as_scalars(&self) -> Option<&[f64]> {
        match self {
            Series::Scalars(v) => Some(v),
            Series::Rows(_) => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Vec<f32>]> {
        match self {
            Series::Rows(v) => Some(v),
            Series::Scalars(_) => None,
        }
    }

    /// Most recent scalar, if this is a non-empty scalar series.
    pub fn last_scalar(&self) -> Option<f64> {
        self.as_scalars().and_then(|v| v.last().copied())
    }
}

/// An immutable view of accumulated series, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    series: BTreeMap<String, Series>,
}

impl ResultsSnapshot {
    pub fn get(&self, key: &str) -> Option<&Series> {
        self.series.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Series)> {
        self.series.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn last_scalar(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Series::last_scalar)
    }
}

/// Accumulator for the current flush interval.
#[derive(Debug, Clone, Default)]
pub struct RoundResults {
    series: BTreeMap<String, Series>,
}

impl RoundResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scalar(&mut self, key: &str, value: f64) {
        match self
            .series
            .entry(key.to_string())
            .or_insert_with(|| Series::Scalars(Vec::new()))
        {
            Series::Scalars(v) => v.push(value),
            Series::Rows(_) => log::warn!("Metric '{}' holds rows, dropping scalar", key),
        }
    }

    pub fn push_row(&mut self, key: &str, row: Vec<f32>) {
        match self
            .series
            .entry(key.to_string())
            .or_insert_with(|| Series::Rows(Vec::new()))
        {
            Series::Rows(v) => v.push(row),
            Series::Scalars(_) => log::warn!("Metric '{}' holds scalars, dropping row", key),
        }
    }

    /// Push every `dim`-wide row of `flat`.
    pub fn push_rows(&mut self, key: &str, flat: &[f32], dim: usize) {
        for row in flat.chunks_exact(dim.max(1)) {
            self.push_row(key, row.to_vec());
        }
    }

    pub fn push_scalars(&mut self, key: &str, values: &[f32]) {
        for &v in values {
            self.push_scalar(key, v as f64);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Series> {
        self.series.get(key)
    }

    pub fn snapshot(&self) -> ResultsSnapshot {
        ResultsSnapshot {
            series: self.series.clone(),
        }
    }

    /// Snapshot and clear.
    pub fn take(&mut self) -> ResultsSnapshot {
        ResultsSnapshot {
            series: std::mem::take(&mut self.series),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_and_take() {
        let mut results = RoundResults::new();
        results.push_scalar(keys::FRAME, 8.0);
        results.push_scalar(keys::FRAME, 16.0);
        results.push_rows(keys::POLICIES, &[0.1, 0.2, 0.3, 0.4], 2);

        let snapshot = results.take();
        assert!(results.is_empty());
        assert_eq!(snapshot.last_scalar(keys::FRAME), Some(16.0));
        assert_eq!(
            snapshot.get(keys::POLICIES).and_then(Series::as_rows).map(|r| r.len()),
            Some(2)
        );
    }

    #[test]
    fn test_series_append_concatenates() {
        let mut a = Series::Scalars(vec![1.0]);
        a.append("k", &Series::Scalars(vec![2.0, 3.0])).unwrap();
        assert_eq!(a, Series::Scalars(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_series_kind_mismatch_is_corrupt() {
        let mut a = Series::Scalars(vec![1.0]);
        let err = a.append("grad", &Series::Rows(vec![vec![0.0]])).unwrap_err();
        assert!(matches!(err, BboError::CorruptMetrics { ref key, .. } if key == "grad"));
    }

    #[test]
    fn test_mismatched_push_is_dropped() {
        let mut results = RoundResults::new();
        results.push_row(keys::GRAD, vec![1.0, 2.0]);
        results.push_scalar(keys::GRAD, 3.0);
        assert_eq!(results.get(keys::GRAD).map(Series::len), Some(1));
    }
}
