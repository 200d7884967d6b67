//! Surrogate models of the objective and their training procedures.

pub mod fitter;
pub mod loss;
pub mod networks;

#[cfg(test)]
mod tests;

pub use fitter::{FitReport, FitSettings, NetFit, SurrogateFitter, SurrogateModel};
pub use loss::{pair_loss, pair_weight};
pub use networks::{DerivativeNet, Mlp, Surrogate, SurrogateNetConfig, ValueNet};
