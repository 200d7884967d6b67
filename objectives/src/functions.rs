//! Raw test functions over shifted native coordinates.
//!
//! Every function takes `z = x - x_opt` and has its global minimum 0 at
//! `z = 0`.

use std::f64::consts::PI;

use crate::config::BenchmarkFunction;

/// Conditioning of the ellipsoid's axes.
const ELLIPSOID_CONDITION: f64 = 1e6;

pub fn sphere(z: &[f64]) -> f64 {
    z.iter().map(|v| v * v).sum()
}

pub fn ellipsoid(z: &[f64]) -> f64 {
    let d = z.len();
    if d == 1 {
        return z[0] * z[0];
    }
    z.iter()
        .enumerate()
        .map(|(i, v)| ELLIPSOID_CONDITION.powf(i as f64 / (d - 1) as f64) * v * v)
        .sum()
}

/// Rosenbrock shifted so the valley floor passes through `z = 0`.
pub fn rosenbrock(z: &[f64]) -> f64 {
    z.windows(2)
        .map(|w| {
            let (a, b) = (w[0] + 1.0, w[1] + 1.0);
            100.0 * (a * a - b).powi(2) + (a - 1.0).powi(2)
        })
        .sum()
}

pub fn rastrigin(z: &[f64]) -> f64 {
    10.0 * z.len() as f64 + z.iter().map(|v| v * v - 10.0 * (2.0 * PI * v).cos()).sum::<f64>()
}

pub fn evaluate(function: BenchmarkFunction, z: &[f64]) -> f64 {
    match function {
        BenchmarkFunction::Sphere => sphere(z),
        BenchmarkFunction::Ellipsoid => ellipsoid(z),
        BenchmarkFunction::Rosenbrock => rosenbrock(z),
        BenchmarkFunction::Rastrigin => rastrigin(z),
        BenchmarkFunction::Constant => 0.0,
    }
}
