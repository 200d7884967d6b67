//! Agent configuration.
//!
//! All tunable constants of a run live in [`AgentConfig`]. The minimizer
//! validates the config once at construction and treats it as immutable for
//! the rest of the run.
//!
//! # Example
//!
//! ```ignore
//! use trust_region_bbo::{AgentConfig, SurrogateMethod};
//!
//! let config = AgentConfig::new()
//!     .with_method(SurrogateMethod::SecondOrder)
//!     .with_n_explore(16)
//!     .with_budget(20_000)
//!     .with_seed(7);
//! config.validate()?;
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// Surrogate method selector
// ============================================================================

/// Which surrogate the agent fits to the replay buffer each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurrogateMethod {
    /// Regress a value network directly onto normalized rewards.
    Value,
    /// Match a derivative network's linear prediction to reward differences.
    FirstOrder,
    /// First-order matching with a curvature correction on the target.
    SecondOrder,
    /// Value network first, then a derivative network on synthetic offsets.
    Anchor,
}

impl SurrogateMethod {
    /// Canonical configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::FirstOrder => "first_order",
            Self::SecondOrder => "second_order",
            Self::Anchor => "anchor",
        }
    }

    /// Whether this method trains a value network.
    pub fn uses_value_net(&self) -> bool {
        matches!(self, Self::Value | Self::Anchor)
    }

    /// Whether this method trains a derivative network.
    pub fn uses_derivative_net(&self) -> bool {
        !matches!(self, Self::Value)
    }
}

impl fmt::Display for SurrogateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurrogateMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(Self::Value),
            "first_order" => Ok(Self::FirstOrder),
            "second_order" => Ok(Self::SecondOrder),
            "anchor" => Ok(Self::Anchor),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

// ============================================================================
// Loss settings
// ============================================================================

/// Elementwise loss used by every surrogate fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LossKind {
    /// Squared error.
    Mse,
    /// Huber loss, quadratic inside `delta` and linear outside.
    Huber { delta: f32 },
}

/// How elementwise losses are reduced to a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReduction {
    Mean,
    Sum,
}

// ============================================================================
// AgentConfig
// ============================================================================

/// Configuration for the trust-region minimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // ========================================================================
    // Exploration
    // ========================================================================
    /// Samples evaluated per exploration round (the exploration batch size).
    pub n_explore: usize,

    /// Random samples drawn during each warmup. Must be a multiple of `n_explore`.
    pub warmup_explore: usize,

    /// Std of the Gaussian exploration perturbation in unconstrained coordinates.
    pub epsilon: f32,

    /// Factor applied to `epsilon` on every shrink-and-restart.
    pub epsilon_factor: f32,

    /// Move the policy to the best explored sample before fitting.
    pub best_explore_update: bool,

    // ========================================================================
    // Replay buffer
    // ========================================================================
    /// Maximum number of samples retained in the replay buffer.
    pub replay_memory_size: usize,

    /// Minibatch size for surrogate training.
    pub max_batch: usize,

    // ========================================================================
    // Surrogate training
    // ========================================================================
    /// Surrogate method.
    pub method: SurrogateMethod,

    /// Training epochs after every exploration round.
    pub value_iter: usize,

    /// Training epochs after every warmup.
    pub warmup_epochs: usize,

    /// Adam learning rate for the surrogate networks.
    pub surrogate_lr: f64,

    /// Width of each hidden layer.
    pub hidden_size: usize,

    /// Number of hidden layers.
    pub n_hidden_layers: usize,

    /// Gradient norm clipping for surrogate updates. None = no clipping.
    pub max_grad_norm: Option<f32>,

    /// Down-weight distant pairs by inverse distance.
    pub importance_sampling: bool,

    /// Evaluate the second-order curvature at the pair midpoint (else at the anchor).
    pub second_order_midpoint: bool,

    /// Std of the synthetic offsets used by the anchor method.
    pub anchor_perturbation: f32,

    /// Elementwise loss.
    pub loss: LossKind,

    /// Loss reduction.
    pub loss_reduction: LossReduction,

    // ========================================================================
    // Policy step
    // ========================================================================
    /// Step size of the policy update `pi <- pi - pi_lr * grad`.
    pub pi_lr: f32,

    /// Factor applied to `pi_lr` on every shrink-and-restart.
    pub pi_lr_factor: f32,

    /// Clip the surrogate gradient to this L2 norm before stepping. None = no clipping.
    pub max_pi_grad_norm: Option<f32>,

    // ========================================================================
    // Trust region
    // ========================================================================
    /// Half-width contraction applied by each squeeze. Must lie in (0, 1).
    pub contraction: f32,

    /// Admissible real-coordinate domain, shared by every dimension.
    pub domain: (f32, f32),

    // ========================================================================
    // Reward normalization
    // ========================================================================
    /// Weight of each new batch in the running robust statistics.
    pub normalizer_momentum: f32,

    // ========================================================================
    // Loop control
    // ========================================================================
    /// Rounds without improvement tolerated before shrink-and-restart.
    pub patience: usize,

    /// Evaluation-frame budget. Reaching it terminates the run as a failure.
    pub budget: usize,

    /// Flush interval, in exploration batches.
    pub printing_interval: usize,

    /// Overshoot below the known optimum that counts as success.
    pub success_margin: f32,

    /// Seed for exploration and minibatch sampling. None = OS entropy.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            n_explore: 32,
            warmup_explore: 128,
            epsilon: 0.1,
            epsilon_factor: 0.97,
            best_explore_update: false,

            replay_memory_size: 1024,
            max_batch: 64,

            method: SurrogateMethod::FirstOrder,
            value_iter: 20,
            warmup_epochs: 20,
            surrogate_lr: 1e-3,
            hidden_size: 64,
            n_hidden_layers: 2,
            max_grad_norm: None,
            importance_sampling: true,
            second_order_midpoint: true,
            anchor_perturbation: 1.0,
            loss: LossKind::Mse,
            loss_reduction: LossReduction::Mean,

            pi_lr: 0.01,
            pi_lr_factor: 1.0,
            max_pi_grad_norm: None,

            contraction: 0.5,
            domain: (-1.0, 1.0),

            normalizer_momentum: 0.1,

            patience: 40,
            budget: 150_000,
            printing_interval: 50,
            success_margin: 1.0,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: SurrogateMethod) -> Self {
        self.method = method;
        self
    }

    /// Select the surrogate method by name. Unknown names are rejected.
    pub fn with_method_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.method = name.parse()?;
        Ok(self)
    }

    pub fn with_n_explore(mut self, n: usize) -> Self {
        self.n_explore = n;
        self
    }

    pub fn with_warmup_explore(mut self, n: usize) -> Self {
        self.warmup_explore = n;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32, factor: f32) -> Self {
        self.epsilon = epsilon;
        self.epsilon_factor = factor;
        self
    }

    pub fn with_best_explore_update(mut self, enabled: bool) -> Self {
        self.best_explore_update = enabled;
        self
    }

    pub fn with_replay_memory_size(mut self, size: usize) -> Self {
        self.replay_memory_size = size;
        self
    }

    pub fn with_max_batch(mut self, batch: usize) -> Self {
        self.max_batch = batch;
        self
    }

    /// Set the per-round and warmup training epochs.
    pub fn with_epochs(mut self, value_iter: usize, warmup_epochs: usize) -> Self {
        self.value_iter = value_iter;
        self.warmup_epochs = warmup_epochs;
        self
    }

    pub fn with_surrogate_lr(mut self, lr: f64) -> Self {
        self.surrogate_lr = lr;
        self
    }

    /// Set the surrogate network shape.
    pub fn with_network(mut self, hidden_size: usize, n_hidden_layers: usize) -> Self {
        self.hidden_size = hidden_size;
        self.n_hidden_layers = n_hidden_layers;
        self
    }

    pub fn with_max_grad_norm(mut self, norm: Option<f32>) -> Self {
        self.max_grad_norm = norm;
        self
    }

    pub fn with_importance_sampling(mut self, enabled: bool) -> Self {
        self.importance_sampling = enabled;
        self
    }

    pub fn with_second_order_midpoint(mut self, midpoint: bool) -> Self {
        self.second_order_midpoint = midpoint;
        self
    }

    pub fn with_anchor_perturbation(mut self, std: f32) -> Self {
        self.anchor_perturbation = std;
        self
    }

    pub fn with_loss(mut self, loss: LossKind, reduction: LossReduction) -> Self {
        self.loss = loss;
        self.loss_reduction = reduction;
        self
    }

    pub fn with_pi_lr(mut self, lr: f32, factor: f32) -> Self {
        self.pi_lr = lr;
        self.pi_lr_factor = factor;
        self
    }

    pub fn with_max_pi_grad_norm(mut self, norm: Option<f32>) -> Self {
        self.max_pi_grad_norm = norm;
        self
    }

    pub fn with_contraction(mut self, contraction: f32) -> Self {
        self.contraction = contraction;
        self
    }

    pub fn with_domain(mut self, lower: f32, upper: f32) -> Self {
        self.domain = (lower, upper);
        self
    }

    pub fn with_normalizer_momentum(mut self, momentum: f32) -> Self {
        self.normalizer_momentum = momentum;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_printing_interval(mut self, interval: usize) -> Self {
        self.printing_interval = interval;
        self
    }

    pub fn with_success_margin(mut self, margin: f32) -> Self {
        self.success_margin = margin;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Frames between two results flushes.
    pub fn flush_frames(&self) -> usize {
        self.printing_interval * self.n_explore
    }

    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(param: &'static str, message: String) -> Result<(), ConfigError> {
            Err(ConfigError::InvalidParam { param, message })
        }

        if self.n_explore == 0 {
            return invalid("n_explore", "must be positive".into());
        }
        if self.max_batch == 0 {
            return invalid("max_batch", "must be positive".into());
        }
        if self.warmup_explore == 0 || self.warmup_explore % self.n_explore != 0 {
            return invalid(
                "warmup_explore",
                format!(
                    "must be a positive multiple of n_explore ({}), got {}",
                    self.n_explore, self.warmup_explore
                ),
            );
        }
        if self.warmup_explore < self.max_batch {
            return invalid(
                "warmup_explore",
                format!(
                    "must be at least max_batch ({}) so warmup can form a minibatch, got {}",
                    self.max_batch, self.warmup_explore
                ),
            );
        }
        if self.replay_memory_size < self.warmup_explore {
            return invalid(
                "replay_memory_size",
                format!(
                    "must hold at least one warmup batch ({}), got {}",
                    self.warmup_explore, self.replay_memory_size
                ),
            );
        }
        if self.hidden_size == 0 {
            return invalid("hidden_size", "must be positive".into());
        }
        if !(self.contraction > 0.0 && self.contraction < 1.0) {
            return invalid(
                "contraction",
                format!("must lie in (0, 1), got {}", self.contraction),
            );
        }
        if !(self.domain.0 < self.domain.1) || !self.domain.0.is_finite() || !self.domain.1.is_finite() {
            return invalid(
                "domain",
                format!("lower must be below upper, got {:?}", self.domain),
            );
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return invalid("epsilon", format!("must be positive, got {}", self.epsilon));
        }
        if !(self.epsilon_factor > 0.0 && self.epsilon_factor <= 1.0) {
            return invalid(
                "epsilon_factor",
                format!("must lie in (0, 1], got {}", self.epsilon_factor),
            );
        }
        if !(self.pi_lr > 0.0 && self.pi_lr.is_finite()) {
            return invalid("pi_lr", format!("must be positive, got {}", self.pi_lr));
        }
        if !(self.pi_lr_factor > 0.0 && self.pi_lr_factor <= 1.0) {
            return invalid(
                "pi_lr_factor",
                format!("must lie in (0, 1], got {}", self.pi_lr_factor),
            );
        }
        if !(self.surrogate_lr > 0.0 && self.surrogate_lr.is_finite()) {
            return invalid(
                "surrogate_lr",
                format!("must be positive, got {}", self.surrogate_lr),
            );
        }
        if !(self.normalizer_momentum > 0.0 && self.normalizer_momentum <= 1.0) {
            return invalid(
                "normalizer_momentum",
                format!("must lie in (0, 1], got {}", self.normalizer_momentum),
            );
        }
        if !(self.anchor_perturbation > 0.0) {
            return invalid(
                "anchor_perturbation",
                format!("must be positive, got {}", self.anchor_perturbation),
            );
        }
        if let LossKind::Huber { delta } = self.loss {
            if !(delta > 0.0) {
                return invalid("loss", format!("huber delta must be positive, got {}", delta));
            }
        }
        if self.printing_interval == 0 {
            return invalid("printing_interval", "must be positive".into());
        }
        if self.budget == 0 {
            return invalid("budget", "must be positive".into());
        }
        Ok(())
    }
}
