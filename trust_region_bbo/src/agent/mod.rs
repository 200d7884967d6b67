//! The trust-region minimization agent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use trust_region_bbo::agent::{RoundOutcome, TrustRegionMinimizer};
//! use trust_region_bbo::config::AgentConfig;
//!
//! let mut minimizer = TrustRegionMinimizer::<Autodiff<NdArray>, _>::new(config, objective, &device)?;
//! for outcome in &mut minimizer {
//!     match outcome? {
//!         RoundOutcome::Done(results) => println!("solved: {:?}", results.last_scalar("best_pi_evaluate")),
//!         RoundOutcome::Failed(reason) => println!("failed: {:?}", reason),
//!         _ => {}
//!     }
//! }
//! ```

pub mod exploration;
pub mod minimizer;
pub mod state;


pub use minimizer::{FailureReason, RoundOutcome, TrustRegionMinimizer};
pub use state::{AgentState, Phase};
