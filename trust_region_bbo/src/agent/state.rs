//! Persisted minimizer state.

use serde::{Deserialize, Serialize};

use crate::config::SurrogateMethod;
use crate::core::{ReplayBuffer, RobustNormalizer, SampleSet, TrustRegion};

/// Where the minimizer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Next step starts with a warmup (start of run or after a restart).
    Warmup,
    /// Next step is a plain explore-fit-step round.
    Explore,
    /// A terminal outcome was reported.
    Finished,
}

/// Everything needed to continue a run, apart from surrogate weights and
/// the random generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub method: SurrogateMethod,
    pub phase: Phase,
    /// Objective evaluations spent.
    pub frame: usize,
    /// Rounds completed.
    pub round: usize,
    /// Rounds since the last restart.
    pub counter: usize,
    /// Restarts so far.
    pub divergence: usize,
    /// Rounds without improving `best_pi_evaluate`.
    pub no_change: usize,
    pub epsilon: f32,
    pub pi_lr: f32,
    /// Policy in unconstrained coordinates.
    pub pi: Vec<f32>,
    pub mean_grad: Vec<f32>,
    pub trust_region: TrustRegion,
    pub normalizer: RobustNormalizer,
    /// Replay in unconstrained coordinates.
    pub replay: ReplayBuffer,
    /// Real-coordinate exploration samples since the last flush.
    pub history: SampleSet,
    pub best_pi_evaluate: f32,
    /// Real-coordinate point of `best_pi_evaluate`.
    pub best_point: Option<Vec<f32>>,
    /// Objective value of the policy after the last completed round.
    pub reward_pi: f32,
    /// Objective value of the initial policy.
    pub f0: f32,
}

impl AgentState {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
