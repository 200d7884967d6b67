//! Decay schedules for the exploration magnitude and the policy step size.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trust_region_bbo::scheduling::ExponentialDecay;
//!
//! let epsilon = ExponentialDecay::new(0.1, 0.97);
//! // After the third shrink-and-restart:
//! let eps = epsilon.value_at(3);
//! ```

pub mod decay;


pub use decay::ExponentialDecay;
