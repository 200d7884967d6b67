//! Benchmark instance implementing [`Objective`].

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use trust_region_bbo::{Objective, Optimum};

use crate::config::{BenchmarkConfig, BenchmarkError, BenchmarkFunction};
use crate::functions;

/// Fraction of the native box the shifted optimum may occupy.
const SHIFT_FRACTION: f64 = 0.8;
/// Range of the seeded value offset.
const OFFSET_RANGE: f64 = 100.0;

/// A shifted, offset test function seen through the normalized `[-1, 1]`
/// domain.
///
/// The agent hands over normalized points. They are mapped into
/// `[lower, upper]`, moved by the seeded optimum, and the result is offset
/// by `f_opt`. Counted evaluations update the best record.
#[derive(Debug, Clone)]
pub struct Benchmark {
    config: BenchmarkConfig,
    /// Optimum in native coordinates.
    x_opt: Vec<f64>,
    f_opt: f64,
    evaluations: usize,
    best: Option<(f32, Vec<f32>)>,
    /// Best `f - f_opt`, unrounded.
    best_excess: f64,
    /// Best value after every counted evaluation.
    trace: Vec<f32>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Result<Self, BenchmarkError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let (x_opt, f_opt) = if config.shift {
            let half = 0.5 * (config.upper - config.lower) * SHIFT_FRACTION;
            let mid = 0.5 * (config.upper + config.lower);
            let position = Uniform::new_inclusive(mid - half, mid + half);
            let x_opt = (0..config.dim).map(|_| position.sample(&mut rng)).collect();
            let offset = Uniform::new_inclusive(-OFFSET_RANGE, OFFSET_RANGE).sample(&mut rng);
            (x_opt, (offset * 100.0).round() / 100.0)
        } else {
            (vec![0.0; config.dim], 0.0)
        };

        debug!(
            "{} benchmark: dim={}, seed={}, f_opt={:.2}",
            config.function, config.dim, config.seed, f_opt
        );

        Ok(Self {
            config,
            x_opt,
            f_opt,
            evaluations: 0,
            best: None,
            best_excess: f64::INFINITY,
            trace: Vec::new(),
        })
    }

    /// Unshifted instance with the optimum at the center of the box.
    pub fn centered(function: BenchmarkFunction, dim: usize) -> Result<Self, BenchmarkError> {
        Self::new(BenchmarkConfig::new(function, dim).with_shift(false))
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn function(&self) -> BenchmarkFunction {
        self.config.function
    }

    pub fn f_opt(&self) -> f64 {
        self.f_opt
    }

    /// Optimum in native coordinates.
    pub fn x_opt(&self) -> &[f64] {
        &self.x_opt
    }

    /// Best value after each counted evaluation.
    pub fn trace(&self) -> &[f32] {
        &self.trace
    }

    /// Evaluate a point given in native coordinates.
    pub fn native_value(&self, x: &[f64]) -> f64 {
        self.native_excess(x) + self.f_opt
    }

    /// Best `f - f_opt` over counted evaluations.
    pub fn best_excess(&self) -> Option<f64> {
        self.best.as_ref().map(|_| self.best_excess)
    }

    fn native_excess(&self, x: &[f64]) -> f64 {
        let z: Vec<f64> = x.iter().zip(&self.x_opt).map(|(a, b)| a - b).collect();
        functions::evaluate(self.config.function, &z)
    }

    fn to_native(&self, policy: &[f32]) -> Vec<f64> {
        let (lo, hi) = (self.config.lower, self.config.upper);
        policy
            .iter()
            .map(|&u| lo + (u as f64 + 1.0) * 0.5 * (hi - lo))
            .collect()
    }

    fn to_normalized(&self, x: &[f64]) -> Vec<f32> {
        let (lo, hi) = (self.config.lower, self.config.upper);
        x.iter()
            .map(|&v| (2.0 * (v - lo) / (hi - lo) - 1.0) as f32)
            .collect()
    }

    fn point_value(&self, policy: &[f32]) -> f32 {
        self.native_value(&self.to_native(policy)) as f32
    }
}

impl Objective for Benchmark {
    fn dim(&self) -> usize {
        self.config.dim
    }

    fn evaluate(&mut self, policies: &[f32]) -> Vec<f32> {
        let dim = self.config.dim;
        let mut rewards = Vec::with_capacity(policies.len() / dim);
        for point in policies.chunks_exact(dim) {
            let excess = self.native_excess(&self.to_native(point));
            let r = (excess + self.f_opt) as f32;
            self.evaluations += 1;
            if self.best.is_none() || excess < self.best_excess {
                self.best_excess = excess;
                self.best = Some((r, point.to_vec()));
            }
            if let Some((b, _)) = &self.best {
                self.trace.push(*b);
            }
            rewards.push(r);
        }
        rewards
    }

    fn value(&mut self, policy: &[f32]) -> f32 {
        self.point_value(policy)
    }

    fn reset(&mut self) {
        self.evaluations = 0;
        self.best = None;
        self.best_excess = f64::INFINITY;
        self.trace.clear();
    }

    fn best_observed(&self) -> Option<f32> {
        self.best.as_ref().map(|(b, _)| *b)
    }

    fn best_point(&self) -> Option<Vec<f32>> {
        self.best.as_ref().map(|(_, p)| p.clone())
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn solved(&self) -> bool {
        if self.config.function == BenchmarkFunction::Constant {
            return false;
        }
        self.best.is_some() && self.best_excess < self.config.tolerance
    }

    fn optimum(&self) -> Option<Optimum> {
        if self.config.function == BenchmarkFunction::Constant {
            return None;
        }
        Some(Optimum {
            point: self.to_normalized(&self.x_opt),
            value: self.f_opt as f32,
        })
    }

    fn denormalize(&self, policy: &[f32]) -> Vec<f32> {
        self.to_native(policy).into_iter().map(|v| v as f32).collect()
    }
}
