//! Core numeric state of the optimizer: coordinate transform, reward
//! statistics and replay.

pub mod replay;
pub mod robust_normalizer;
pub mod trust_region;

pub use replay::{ReplayBuffer, ReplayView, SampleSet};
pub use robust_normalizer::RobustNormalizer;
pub use trust_region::{TrustRegion, INVERSE_MARGIN};
