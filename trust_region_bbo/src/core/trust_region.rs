//! Trust-region coordinate transform.
//!
//! The optimizer works in unconstrained coordinates `u`. A point is mapped
//! into the real (bounded) coordinates of the problem through
//!
//! ```text
//! x = mu + sigma * tanh(u)
//! ```
//!
//! so every finite `u` lands strictly inside `(mu - sigma, mu + sigma)` and
//! `u -> ±inf` saturates at the boundary. Squeezing recenters `mu` on a new
//! best point and contracts `sigma`.
//!
//! # Out-of-region inverse
//!
//! `real_to_unconstrained` clamps: the normalized offset `(x - mu) / sigma`
//! is clamped to `±(1 - INVERSE_MARGIN)` before `atanh`, so points on or
//! outside the region boundary map to the nearest representable interior
//! point instead of producing infinities.

use serde::{Deserialize, Serialize};

/// Distance from ±1 kept by the inverse map.
pub const INVERSE_MARGIN: f32 = 1e-6;

/// Center and per-dimension half-width of the trust region, in real coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRegion {
    mu: Vec<f32>,
    sigma: Vec<f32>,
    contraction: f32,
    domain: (f32, f32),
}

impl TrustRegion {
    /// Create a trust region spanning the whole domain.
    ///
    /// # Panics
    /// Panics if `contraction` is not in (0, 1) or the domain is empty.
    pub fn new(dim: usize, domain: (f32, f32), contraction: f32) -> Self {
        assert!(
            contraction > 0.0 && contraction < 1.0,
            "contraction must lie in (0, 1), got {}",
            contraction
        );
        assert!(domain.0 < domain.1, "empty domain {:?}", domain);

        let mut region = Self {
            mu: Vec::new(),
            sigma: Vec::new(),
            contraction,
            domain,
        };
        region.reset(dim);
        region
    }

    /// Rebuild from a persisted center and half-width.
    pub fn from_parts(mu: Vec<f32>, sigma: Vec<f32>, domain: (f32, f32), contraction: f32) -> Self {
        assert_eq!(mu.len(), sigma.len(), "mu/sigma dimension mismatch");
        assert!(sigma.iter().all(|&s| s > 0.0), "sigma must be positive");
        Self {
            mu,
            sigma,
            contraction,
            domain,
        }
    }

    /// Full-width reinitialization: centered on the domain, half-width covering it.
    pub fn reset(&mut self, dim: usize) {
        let (lower, upper) = self.domain;
        self.mu = vec![0.5 * (lower + upper); dim];
        self.sigma = vec![0.5 * (upper - lower); dim];
    }

    /// Map an unconstrained point into real coordinates.
    pub fn unconstrained_to_real(&self, u: &[f32]) -> Vec<f32> {
        debug_assert_eq!(u.len(), self.dim());
        u.iter()
            .zip(self.mu.iter().zip(&self.sigma))
            .map(|(&u, (&mu, &sigma))| mu + sigma * u.tanh())
            .collect()
    }

    /// Map a real point into unconstrained coordinates, clamping to the region.
    pub fn real_to_unconstrained(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.dim());
        let limit = 1.0 - INVERSE_MARGIN;
        x.iter()
            .zip(self.mu.iter().zip(&self.sigma))
            .map(|(&x, (&mu, &sigma))| ((x - mu) / sigma).clamp(-limit, limit).atanh())
            .collect()
    }

    /// Apply `unconstrained_to_real` to a flat batch of points.
    pub fn batch_to_real(&self, flat: &[f32]) -> Vec<f32> {
        flat.chunks_exact(self.dim())
            .flat_map(|u| self.unconstrained_to_real(u))
            .collect()
    }

    /// Lower and upper corners `(mu - sigma, mu + sigma)`.
    pub fn boundaries(&self) -> (Vec<f32>, Vec<f32>) {
        let lower = self.mu.iter().zip(&self.sigma).map(|(m, s)| m - s).collect();
        let upper = self.mu.iter().zip(&self.sigma).map(|(m, s)| m + s).collect();
        (lower, upper)
    }

    /// Whether `x` lies in the closed region.
    pub fn contains(&self, x: &[f32]) -> bool {
        x.iter()
            .zip(self.mu.iter().zip(&self.sigma))
            .all(|(&x, (&mu, &sigma))| (x - mu).abs() <= sigma)
    }

    /// Recenter on `best_real_point` and contract the half-width.
    pub fn squeeze(&mut self, best_real_point: &[f32]) {
        assert_eq!(best_real_point.len(), self.dim(), "squeeze dimension mismatch");
        self.mu.copy_from_slice(best_real_point);
        for sigma in &mut self.sigma {
            *sigma *= self.contraction;
        }
    }

    /// Clamp a real point to the admissible domain.
    pub fn clamp_to_domain(&self, x: &[f32]) -> Vec<f32> {
        x.iter().map(|v| v.clamp(self.domain.0, self.domain.1)).collect()
    }

    pub fn mu(&self) -> &[f32] {
        &self.mu
    }

    pub fn sigma(&self) -> &[f32] {
        &self.sigma
    }

    /// Smallest half-width across dimensions.
    pub fn min_sigma(&self) -> f32 {
        self.sigma.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    pub fn contraction(&self) -> f32 {
        self.contraction
    }

    pub fn domain(&self) -> (f32, f32) {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_region(dim: usize) -> TrustRegion {
        TrustRegion::new(dim, (-1.0, 1.0), 0.5)
    }

    #[test]
    fn test_reset_covers_domain() {
        let region = TrustRegion::new(3, (-5.0, 3.0), 0.5);
        assert_eq!(region.mu(), &[-1.0, -1.0, -1.0]);
        assert_eq!(region.sigma(), &[4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_round_trip() {
        let mut region = unit_region(3);
        region.squeeze(&[0.2, -0.4, 0.1]);

        for u in [[0.0, 0.5, -1.0], [2.0, -3.0, 0.25], [-0.7, 1.3, 4.0]] {
            let x = region.unconstrained_to_real(&u);
            let back = region.real_to_unconstrained(&x);
            for (a, b) in u.iter().zip(&back) {
                assert!((a - b).abs() < 1e-2, "round trip {} -> {}", a, b);
            }
        }
    }

    #[test]
    fn test_boundaries_ordered_and_contain_image() {
        let mut region = unit_region(2);
        region.squeeze(&[0.5, -0.5]);
        let (lower, upper) = region.boundaries();

        for (l, h) in lower.iter().zip(&upper) {
            assert!(l < h);
        }
        for u in [[-50.0, 50.0], [0.0, 0.0], [1e6, -1e6], [3.0, -0.1]] {
            let x = region.unconstrained_to_real(&u);
            for i in 0..2 {
                assert!(x[i] >= lower[i] && x[i] <= upper[i]);
            }
        }
    }

    #[test]
    fn test_saturation_at_infinity() {
        let region = unit_region(1);
        assert_eq!(region.unconstrained_to_real(&[f32::INFINITY]), vec![1.0]);
        assert_eq!(region.unconstrained_to_real(&[f32::NEG_INFINITY]), vec![-1.0]);
    }

    #[test]
    fn test_squeeze_scenario() {
        let mut region = unit_region(1);
        region.squeeze(&[0.3]);
        assert_eq!(region.mu(), &[0.3]);
        assert_eq!(region.sigma(), &[0.5]);
    }

    #[test]
    fn test_squeeze_strictly_reduces_sigma() {
        let mut region = TrustRegion::new(2, (-1.0, 1.0), 0.8);
        let before = region.sigma().to_vec();
        region.squeeze(&[0.1, 0.2]);
        for (b, a) in before.iter().zip(region.sigma()) {
            assert!(a < b);
            assert!((a - b * 0.8).abs() < 1e-7);
        }
        assert_eq!(region.mu(), &[0.1, 0.2]);
    }

    #[test]
    fn test_inverse_clamps_outside_region() {
        let mut region = unit_region(1);
        region.squeeze(&[0.0]);

        let outside = region.real_to_unconstrained(&[0.9]);
        let boundary = region.real_to_unconstrained(&[0.5]);
        assert!(outside[0].is_finite());
        assert_eq!(outside, boundary);

        let x = region.unconstrained_to_real(&outside);
        assert!(x[0] <= 0.5 && x[0] > 0.49);
    }

    #[test]
    fn test_batch_transforms() {
        let region = unit_region(2);
        let flat = vec![0.0, 0.5, -0.5, 1.0];
        let real = region.batch_to_real(&flat);
        assert_eq!(real.len(), 4);
        let back: Vec<f32> = real.chunks(2).flat_map(|x| region.real_to_unconstrained(x)).collect();
        for (a, b) in flat.iter().zip(&back) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_clamp_to_domain() {
        let region = unit_region(3);
        assert_eq!(region.clamp_to_domain(&[-2.0, 0.3, 1.5]), vec![-1.0, 0.3, 1.0]);
    }

    #[test]
    fn test_min_sigma() {
        let region = TrustRegion::from_parts(vec![0.0, 0.0], vec![0.4, 0.2], (-1.0, 1.0), 0.5);
        assert_eq!(region.min_sigma(), 0.2);
        assert!(region.contains(&[0.3, -0.2]));
        assert!(!region.contains(&[0.3, -0.25]));
    }
}
