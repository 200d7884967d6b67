//! # Benchmark Objectives
//!
//! Classic continuous test functions packaged as [`trust_region_bbo::Objective`]
//! implementations for exercising the trust-region agent.
//!
//! ## Features
//!
//! - **Normalized domain**: the agent works in `[-1, 1]^d`, mapped onto a
//!   native box (default `[-5, 5]^d`)
//! - **Seeded instances**: optimum location and value offset drawn from a seed
//! - **Budget accounting**: counted evaluations, best record, and a best-so-far trace
//! - **Known optimum**: reported in normalized coordinates for distance metrics
//!
//! ## Functions
//!
//! | Name         | Character                        |
//! |--------------|----------------------------------|
//! | `sphere`     | separable, unimodal              |
//! | `ellipsoid`  | separable, ill-conditioned (1e6) |
//! | `rosenbrock` | curved valley, `d >= 2`          |
//! | `rastrigin`  | highly multimodal                |
//! | `constant`   | flat, never solved               |
//!
//! ## Example
//!
//! ```rust,ignore
//! use bbo_objectives::{Benchmark, BenchmarkConfig, BenchmarkFunction};
//!
//! let config = BenchmarkConfig::new(BenchmarkFunction::Rosenbrock, 10).with_seed(1);
//! let objective = Benchmark::new(config)?;
//! ```

pub mod benchmark;
pub mod config;
pub mod functions;

pub use benchmark::Benchmark;
pub use config::{BenchmarkConfig, BenchmarkError, BenchmarkFunction};

#[cfg(test)]
mod tests;
