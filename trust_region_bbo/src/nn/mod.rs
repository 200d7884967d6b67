//! Neural network building blocks for the surrogates.
//!
//! - [`orthogonal`]: orthogonally initialized linear layers

pub mod orthogonal;

pub use orthogonal::{orthogonal_matrix, orthogonal_weights, OrthogonalLinear, OrthogonalLinearConfig, TANH_GAIN};
