//! Robust reward normalization.
//!
//! Tracks a running location (median) and scale (MAD, rescaled to match a
//! standard deviation under normality) of observed rewards, and maps rewards
//! into a stable range for surrogate training.
//!
//! # Example
//! ```ignore
//! use trust_region_bbo::core::RobustNormalizer;
//!
//! let mut norm = RobustNormalizer::new(0.1);
//! let squashed = norm.update(&[1.0, 2.0, 3.0, 4.0, 5.0], true);
//! let restored = norm.desquash(squashed[0]);
//! ```

use serde::{Deserialize, Serialize};

/// Consistency constant that turns a MAD into a std estimate for Gaussian data.
const MAD_TO_STD: f64 = 1.4826;

/// Running median/MAD statistics over reward batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustNormalizer {
    /// Running location estimate.
    location: f64,
    /// Running scale estimate (floored at `epsilon` when applied).
    scale: f64,
    /// Weight of a new batch in the running estimates.
    momentum: f64,
    /// Scale floor.
    epsilon: f64,
    /// Batches folded in since the last reset.
    batches: usize,
}

impl RobustNormalizer {
    /// Create a normalizer in its reset state (location 0, scale 1).
    pub fn new(momentum: f32) -> Self {
        Self {
            location: 0.0,
            scale: 1.0,
            momentum: momentum as f64,
            epsilon: 1e-5,
            batches: 0,
        }
    }

    /// Clear the running statistics.
    pub fn reset(&mut self) {
        self.location = 0.0;
        self.scale = 1.0;
        self.batches = 0;
    }

    /// Normalize `samples`, first folding them into the statistics when `training`.
    ///
    /// The first training batch after a reset replaces the statistics; later
    /// batches are blended in with the configured momentum.
    pub fn update(&mut self, samples: &[f32], training: bool) -> Vec<f32> {
        if training && !samples.is_empty() {
            let (batch_location, batch_scale) = robust_stats(samples);
            if self.batches == 0 {
                self.location = batch_location;
                self.scale = batch_scale;
            } else {
                self.location += self.momentum * (batch_location - self.location);
                self.scale += self.momentum * (batch_scale - self.scale);
            }
            self.batches += 1;
        }
        self.normalize(samples)
    }

    /// Normalize without touching the statistics.
    pub fn normalize(&self, samples: &[f32]) -> Vec<f32> {
        let scale = self.scale();
        samples
            .iter()
            .map(|&x| ((x as f64 - self.location) / scale) as f32)
            .collect()
    }

    /// Map a normalized value back to reward units.
    pub fn desquash(&self, x: f32) -> f32 {
        (x as f64 * self.scale() + self.location) as f32
    }

    /// Current location estimate.
    pub fn location(&self) -> f64 {
        self.location
    }

    /// Current scale estimate, floored at epsilon.
    pub fn scale(&self) -> f64 {
        self.scale.max(self.epsilon)
    }

    /// Number of training batches since the last reset.
    pub fn batches(&self) -> usize {
        self.batches
    }
}

/// Median and rescaled median absolute deviation of a non-empty batch.
fn robust_stats(samples: &[f32]) -> (f64, f64) {
    let mut sorted: Vec<f64> = samples.iter().map(|&x| x as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let med = median_sorted(&sorted);

    let mut deviations: Vec<f64> = sorted.iter().map(|x| (x - med).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let mad = median_sorted(&deviations) * MAD_TO_STD;

    if !mad.is_finite() {
        log::warn!("Non-finite reward scale (mad={}), falling back to 1.0", mad);
        return (med, 1.0);
    }
    (med, mad)
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state_is_identity() {
        let norm = RobustNormalizer::new(0.1);
        assert_eq!(norm.normalize(&[3.0, -2.0]), vec![3.0, -2.0]);
        assert_eq!(norm.desquash(1.5), 1.5);
    }

    #[test]
    fn test_first_batch_sets_median_and_mad() {
        let mut norm = RobustNormalizer::new(0.1);
        let out = norm.update(&[1.0, 2.0, 3.0, 4.0, 5.0], true);

        // median 3, MAD 1 -> scale 1.4826
        assert!((norm.location() - 3.0).abs() < 1e-9);
        assert!((norm.scale() - 1.4826).abs() < 1e-9);
        assert!(out[2].abs() < 1e-6);
        assert!((out[4] - (2.0 / 1.4826) as f32).abs() < 1e-5);
    }

    #[test]
    fn test_inference_update_does_not_mutate() {
        let mut norm = RobustNormalizer::new(0.1);
        norm.reset();
        let trained = norm.update(&[1.0, 2.0, 3.0, 4.0, 5.0], true);
        let snapshot = norm.clone();

        let evaluated = norm.update(&[1.0, 2.0, 3.0, 4.0, 5.0], false);

        assert_eq!(norm, snapshot);
        assert_eq!(trained, evaluated);
    }

    #[test]
    fn test_desquash_inverts_normalize() {
        let mut norm = RobustNormalizer::new(0.1);
        norm.update(&[10.0, 12.0, 15.0, 40.0], true);
        for x in [10.0f32, 13.5, -7.0] {
            let y = norm.normalize(&[x])[0];
            assert!((norm.desquash(y) - x).abs() < 1e-4);
        }
    }

    #[test]
    fn test_constant_batch_is_floored() {
        let mut norm = RobustNormalizer::new(0.1);
        let out = norm.update(&[2.0; 8], true);
        assert_eq!(norm.scale(), 1e-5);
        assert!(out.iter().all(|x| x.is_finite() && x.abs() < 1e-6));
    }

    #[test]
    fn test_momentum_blends_later_batches() {
        let mut norm = RobustNormalizer::new(0.5);
        norm.update(&[0.0, 0.0, 0.0], true);
        norm.update(&[4.0, 4.0, 4.0], true);
        assert!((norm.location() - 2.0).abs() < 1e-9);
        assert_eq!(norm.batches(), 2);
    }

    #[test]
    fn test_reset_clears_statistics() {
        let mut norm = RobustNormalizer::new(0.1);
        norm.update(&[5.0, 6.0, 9.0], true);
        norm.reset();
        assert_eq!(norm.location(), 0.0);
        assert_eq!(norm.scale(), 1.0);
        assert_eq!(norm.batches(), 0);
    }

    #[test]
    fn test_empty_batch_leaves_statistics() {
        let mut norm = RobustNormalizer::new(0.1);
        norm.update(&[1.0, 3.0], true);
        let before = norm.clone();
        assert!(norm.update(&[], true).is_empty());
        assert_eq!(norm, before);
    }
}
