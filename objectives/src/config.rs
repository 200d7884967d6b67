//! Configuration for benchmark objectives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Benchmark functions
// ============================================================================

/// Available test functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BenchmarkFunction {
    Sphere,
    /// Separable ellipsoid with condition number 1e6.
    Ellipsoid,
    Rosenbrock,
    Rastrigin,
    /// Flat function. Has no unique optimum and is never solved.
    Constant,
}

impl BenchmarkFunction {
    pub const ALL: [BenchmarkFunction; 5] = [
        BenchmarkFunction::Sphere,
        BenchmarkFunction::Ellipsoid,
        BenchmarkFunction::Rosenbrock,
        BenchmarkFunction::Rastrigin,
        BenchmarkFunction::Constant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkFunction::Sphere => "sphere",
            BenchmarkFunction::Ellipsoid => "ellipsoid",
            BenchmarkFunction::Rosenbrock => "rosenbrock",
            BenchmarkFunction::Rastrigin => "rastrigin",
            BenchmarkFunction::Constant => "constant",
        }
    }

    /// Smallest dimension the function is defined for.
    pub fn min_dim(&self) -> usize {
        match self {
            BenchmarkFunction::Rosenbrock => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for BenchmarkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkFunction {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BenchmarkFunction::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| BenchmarkError::UnknownFunction(s.to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Invalid benchmark configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum BenchmarkError {
    UnknownFunction(String),
    InvalidDimension { function: BenchmarkFunction, dim: usize },
    InvalidBounds { lower: f64, upper: f64 },
}

impl fmt::Display for BenchmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFunction(name) => write!(f, "Unknown benchmark function '{}'", name),
            Self::InvalidDimension { function, dim } => write!(
                f,
                "{} needs at least {} dimensions, got {}",
                function,
                function.min_dim(),
                dim
            ),
            Self::InvalidBounds { lower, upper } => {
                write!(f, "Invalid search bounds [{}, {}]", lower, upper)
            }
        }
    }
}

impl std::error::Error for BenchmarkError {}

// ============================================================================
// BenchmarkConfig
// ============================================================================

/// Configuration of one benchmark instance.
///
/// # Example
/// ```ignore
/// let config = BenchmarkConfig::new(BenchmarkFunction::Rastrigin, 10)
///     .with_seed(3)
///     .with_tolerance(1e-6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub function: BenchmarkFunction,
    pub dim: usize,
    /// Seed of the optimum shift and value offset.
    pub seed: u64,
    /// Native search box, shared by every dimension.
    pub lower: f64,
    pub upper: f64,
    /// Place the optimum at a seeded random point instead of the origin.
    pub shift: bool,
    /// `best - f_opt` below this counts as solved.
    pub tolerance: f64,
}

impl BenchmarkConfig {
    pub fn new(function: BenchmarkFunction, dim: usize) -> Self {
        Self {
            function,
            dim,
            seed: 0,
            lower: -5.0,
            upper: 5.0,
            shift: true,
            tolerance: 1e-8,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), BenchmarkError> {
        if self.dim < self.function.min_dim() {
            return Err(BenchmarkError::InvalidDimension {
                function: self.function,
                dim: self.dim,
            });
        }
        if !(self.lower < self.upper) || !self.lower.is_finite() || !self.upper.is_finite() {
            return Err(BenchmarkError::InvalidBounds {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }
}
