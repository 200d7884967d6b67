//! Test suite for benchmark objectives.
//!
//! Test modules:
//! - `function_tests`: raw test functions and their minima
//! - `config_tests`: names, builders, and validation
//! - `benchmark_tests`: normalization, shifting, and budget accounting
//! - `integration_tests`: benchmarks driven by the trust-region agent

mod config_tests;
mod function_tests;
