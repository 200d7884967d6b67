//! # Trust-Region BBO: Surrogate-Driven Black-Box Minimization
//!
//! Minimizes an unknown scalar objective over a box by alternating between
//! exploring around a policy point, fitting a learned surrogate of the
//! objective (its value, its gradient, or both), and stepping the policy
//! along the surrogate gradient. When progress stalls the trust region is
//! recentered on the best point seen so far and contracted.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     TrustRegionMinimizer                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   pi ──► perturb ──► TrustRegion ──► Objective::evaluate         │
//! │    ▲      (u)        (u → x)            │                        │
//! │    │                                    ▼                        │
//! │    │                 RobustNormalizer ◄── rewards                │
//! │    │                        │                                    │
//! │    │                        ▼                                    │
//! │    │                  ReplayBuffer ──► SurrogateModel::fit       │
//! │    │                                         │                   │
//! │    └──── pi -= lr · gradient_at(pi) ◄────────┘                   │
//! │                                                                  │
//! │   stall ──► squeeze(best) ──► warmup      flush ──► recorder     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Surrogate methods
//!
//! - `value`: regress the objective, step along the input gradient
//! - `first_order`: regress reward differences onto a learned gradient field
//! - `second_order`: first order with a curvature correction
//! - `anchor`: learned gradient fitted against a learned value
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use trust_region_bbo::{AgentConfig, MultiLogger, ConsoleLogger, TrustRegionMinimizer};
//!
//! let config = AgentConfig::new()
//!     .with_method_name("first_order")?
//!     .with_budget(20_000)
//!     .with_seed(0);
//!
//! let mut minimizer = TrustRegionMinimizer::<Autodiff<NdArray>, _>::new(config, objective, &device)?;
//! let mut logger = MultiLogger::new().add(ConsoleLogger::new(10));
//! let outcome = minimizer.run(&mut logger)?;
//! ```

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod nn;
pub mod objective;
pub mod scheduling;
pub mod surrogate;

// Re-export commonly used types
pub use agent::{AgentState, FailureReason, Phase, RoundOutcome, TrustRegionMinimizer};
pub use checkpoint::{CheckpointStore, Checkpointer, CheckpointerConfig, MemoryCheckpoints};
pub use config::{AgentConfig, LossKind, LossReduction, SurrogateMethod};
pub use error::{BboError, ConfigError, Result};
pub use objective::{FnObjective, Objective, Optimum};

pub use core::{ReplayBuffer, ReplayView, RobustNormalizer, SampleSet, TrustRegion};

pub use metrics::{
    keys, CSVLogger, ConsoleLogger, JsonSeriesRecorder, MemoryRecorder, MetricsLogger,
    MetricsRecorder, MultiLogger, ResultsSnapshot, RoundReport, Series,
};

pub use surrogate::{FitReport, SurrogateFitter, SurrogateModel};
