//! Surrogate training procedures.
//!
//! Four methods fit a surrogate to the replay buffer:
//!
//! | method         | networks            | pair construction                           |
//! |----------------|---------------------|---------------------------------------------|
//! | `value`        | V                   | none, regress `V(p) ≈ r`                    |
//! | `first_order`  | g                   | `(p_j - p_i)·g(p_i) ≈ r_j - r_i`            |
//! | `second_order` | g                   | first order, target minus `0.5·Δ·∇(g·Δ)`    |
//! | `anchor`       | V, then g           | `(p' - p)·g(p) ≈ V(p') - r(p)`, `p' = p + σN` |
//!
//! For first and second order, the reference `j` of anchor `i` is drawn from
//! the same exploration batch as `i`.
//!
//! Each fit runs `epochs` passes. A pass draws `minibatches * max_batch`
//! anchors without replacement (with replacement for the anchor method's
//! synthetic pairs) and takes one Adam step per minibatch. The reported loss
//! is the sum of minibatch losses divided by the epoch count.

use std::path::{Path, PathBuf};

use burn::grad_clipping::GradientClippingConfig;
use burn::module::{AutodiffModule, Module};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::{AgentConfig, LossKind, LossReduction, SurrogateMethod};
use crate::core::ReplayView;
use crate::error::{BboError, Result};

use super::loss::{pair_loss, pair_weight};
use super::networks::{DerivativeNet, Surrogate, SurrogateNetConfig, ValueNet};

/// Losses of one `fit_surrogate` call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitReport {
    pub value_loss: Option<f32>,
    pub derivative_loss: Option<f32>,
}

/// Settings shared by every training procedure.
#[derive(Debug, Clone, Copy)]
pub struct FitSettings {
    pub lr: f64,
    pub max_grad_norm: Option<f32>,
    pub max_batch: usize,
    pub loss: LossKind,
    pub reduction: LossReduction,
    pub importance_sampling: bool,
}

impl FitSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            lr: config.surrogate_lr,
            max_grad_norm: config.max_grad_norm,
            max_batch: config.max_batch,
            loss: config.loss,
            reduction: config.loss_reduction,
            importance_sampling: config.importance_sampling,
        }
    }
}

/// A network with its own Adam state.
pub struct NetFit<B: AutodiffBackend, M: AutodiffModule<B>> {
    net: M,
    optimizer: OptimizerAdaptor<Adam, M, B>,
    lr: f64,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> NetFit<B, M> {
    fn new(net: M, settings: &FitSettings) -> Self {
        let mut adam = AdamConfig::new().with_epsilon(1e-5);
        if let Some(max_norm) = settings.max_grad_norm {
            adam = adam.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
        }
        Self {
            net,
            optimizer: adam.init(),
            lr: settings.lr,
        }
    }

    /// Backpropagate `loss` and take one optimizer step. Returns the loss value.
    fn step(&mut self, loss: Tensor<B, 1>) -> Result<f32> {
        let value = first_value(loss.clone())?;
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.net);
        self.net = self.optimizer.step(self.lr, self.net.clone(), grads);
        Ok(value)
    }

    pub fn net(&self) -> &M {
        &self.net
    }
}

/// Per-method networks and optimizers.
pub enum SurrogateFitter<B: AutodiffBackend> {
    Value(NetFit<B, ValueNet<B>>),
    FirstOrder(NetFit<B, DerivativeNet<B>>),
    SecondOrder {
        fit: NetFit<B, DerivativeNet<B>>,
        midpoint: bool,
    },
    Anchor {
        value: NetFit<B, ValueNet<B>>,
        derivative: NetFit<B, DerivativeNet<B>>,
        perturbation: f32,
    },
}

/// The surrogate of a run: the fitter for the configured method plus the
/// settings needed to rebuild it.
pub struct SurrogateModel<B: AutodiffBackend> {
    fitter: SurrogateFitter<B>,
    method: SurrogateMethod,
    net_config: SurrogateNetConfig,
    settings: FitSettings,
    second_order_midpoint: bool,
    anchor_perturbation: f32,
    device: B::Device,
}

impl<B: AutodiffBackend> SurrogateModel<B> {
    pub fn new(config: &AgentConfig, dim: usize, rng: &mut StdRng, device: &B::Device) -> Self {
        let net_config = SurrogateNetConfig::new(dim, config.hidden_size, config.n_hidden_layers);
        let settings = FitSettings::from_config(config);
        let fitter = build_fitter::<B>(
            config.method,
            &net_config,
            &settings,
            config.second_order_midpoint,
            config.anchor_perturbation,
            rng,
            device,
        );
        Self {
            fitter,
            method: config.method,
            net_config,
            settings,
            second_order_midpoint: config.second_order_midpoint,
            anchor_perturbation: config.anchor_perturbation,
            device: device.clone(),
        }
    }

    /// Fresh networks and optimizer state.
    pub fn reset(&mut self, rng: &mut StdRng) {
        self.fitter = build_fitter::<B>(
            self.method,
            &self.net_config,
            &self.settings,
            self.second_order_midpoint,
            self.anchor_perturbation,
            rng,
            &self.device,
        );
    }

    pub fn method(&self) -> SurrogateMethod {
        self.method
    }

    pub fn fitter(&self) -> &SurrogateFitter<B> {
        &self.fitter
    }

    /// Train on `view` for `epochs` passes.
    pub fn fit_surrogate(&mut self, view: &ReplayView, epochs: usize, rng: &mut StdRng) -> Result<FitReport> {
        let minibatches = view.len() / self.settings.max_batch;
        if minibatches == 0 {
            return Err(BboError::EmptyMinibatch {
                replay_len: view.len(),
                batch: self.settings.max_batch,
            });
        }

        let settings = self.settings;
        let device = self.device.clone();
        let trainer = Trainer::<B> {
            view,
            settings: &settings,
            minibatches,
            epochs,
            device: &device,
        };

        let report = match &mut self.fitter {
            SurrogateFitter::Value(fit) => FitReport {
                value_loss: Some(trainer.fit_value(fit, rng)?),
                derivative_loss: None,
            },
            SurrogateFitter::FirstOrder(fit) => FitReport {
                value_loss: None,
                derivative_loss: Some(trainer.fit_pairs(fit, None, rng)?),
            },
            SurrogateFitter::SecondOrder { fit, midpoint } => FitReport {
                value_loss: None,
                derivative_loss: Some(trainer.fit_pairs(fit, Some(*midpoint), rng)?),
            },
            SurrogateFitter::Anchor {
                value,
                derivative,
                perturbation,
            } => {
                let value_loss = trainer.fit_value(value, rng)?;
                let derivative_loss = trainer.fit_anchor(value.net(), derivative, *perturbation, rng)?;
                FitReport {
                    value_loss: Some(value_loss),
                    derivative_loss: Some(derivative_loss),
                }
            }
        };

        log::trace!(
            "Fitted {} surrogate on {} samples: {:?}",
            self.method,
            view.len(),
            report
        );
        Ok(report)
    }

    /// Surrogate gradient at `pi`.
    ///
    /// Value surrogates return `∇V(pi)`, derivative surrogates return `g(pi)`.
    pub fn gradient_at(&self, pi: &[f32]) -> Result<Vec<f32>> {
        let x = points_tensor::<B>(pi, 1, pi.len(), &self.device);
        match &self.fitter {
            SurrogateFitter::Value(fit) => {
                let ones = Tensor::<B, 2>::ones([1, 1], &self.device);
                let (_, grad) = fit.net.forward_with_input_grad(x, ones);
                to_host(grad)
            }
            SurrogateFitter::FirstOrder(fit) | SurrogateFitter::SecondOrder { fit, .. } => {
                to_host(fit.net.forward(x).detach())
            }
            SurrogateFitter::Anchor { derivative, .. } => to_host(derivative.net.forward(x).detach()),
        }
    }

    /// Value surrogate prediction at `pi`, in normalized reward units.
    ///
    /// `None` for methods without a value network.
    pub fn value_at(&self, pi: &[f32]) -> Result<Option<f32>> {
        let net = match &self.fitter {
            SurrogateFitter::Value(fit) => &fit.net,
            SurrogateFitter::Anchor { value, .. } => &value.net,
            _ => return Ok(None),
        };
        let x = points_tensor::<B>(pi, 1, pi.len(), &self.device);
        let out = net.forward(x).detach();
        Ok(Some(first_value(out.reshape([1]))?))
    }

    /// Save network weights as `<stem>_value.bin` / `<stem>_derivative.bin`.
    pub fn save_weights(&self, dir: &Path, stem: &str) -> Result<()> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let path = |suffix: &str| dir.join(format!("{}_{}", stem, suffix));
        match &self.fitter {
            SurrogateFitter::Value(fit) => save_net::<B, _>(&fit.net, path("value"), &recorder),
            SurrogateFitter::FirstOrder(fit) | SurrogateFitter::SecondOrder { fit, .. } => {
                save_net::<B, _>(&fit.net, path("derivative"), &recorder)
            }
            SurrogateFitter::Anchor { value, derivative, .. } => {
                save_net::<B, _>(&value.net, path("value"), &recorder)?;
                save_net::<B, _>(&derivative.net, path("derivative"), &recorder)
            }
        }
    }

    /// Load weights written by [`save_weights`](Self::save_weights).
    ///
    /// Optimizer state is not persisted and restarts from scratch.
    pub fn load_weights(&mut self, dir: &Path, stem: &str) -> Result<()> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let path = |suffix: &str| dir.join(format!("{}_{}", stem, suffix));
        let device = self.device.clone();
        let settings = self.settings;

        match &mut self.fitter {
            SurrogateFitter::Value(fit) => {
                *fit = NetFit::new(load_net::<B, _>(fit.net.clone(), path("value"), &recorder, &device)?, &settings);
            }
            SurrogateFitter::FirstOrder(fit) | SurrogateFitter::SecondOrder { fit, .. } => {
                *fit = NetFit::new(load_net::<B, _>(fit.net.clone(), path("derivative"), &recorder, &device)?, &settings);
            }
            SurrogateFitter::Anchor { value, derivative, .. } => {
                *value = NetFit::new(load_net::<B, _>(value.net.clone(), path("value"), &recorder, &device)?, &settings);
                *derivative = NetFit::new(
                    load_net::<B, _>(derivative.net.clone(), path("derivative"), &recorder, &device)?,
                    &settings,
                );
            }
        }
        Ok(())
    }
}

fn build_fitter<B: AutodiffBackend>(
    method: SurrogateMethod,
    net_config: &SurrogateNetConfig,
    settings: &FitSettings,
    midpoint: bool,
    perturbation: f32,
    rng: &mut StdRng,
    device: &B::Device,
) -> SurrogateFitter<B> {
    match method {
        SurrogateMethod::Value => SurrogateFitter::Value(NetFit::new(net_config.init_value(rng, device), settings)),
        SurrogateMethod::FirstOrder => {
            SurrogateFitter::FirstOrder(NetFit::new(net_config.init_derivative(rng, device), settings))
        }
        SurrogateMethod::SecondOrder => SurrogateFitter::SecondOrder {
            fit: NetFit::new(net_config.init_derivative(rng, device), settings),
            midpoint,
        },
        SurrogateMethod::Anchor => SurrogateFitter::Anchor {
            value: NetFit::new(net_config.init_value(rng, device), settings),
            derivative: NetFit::new(net_config.init_derivative(rng, device), settings),
            perturbation,
        },
    }
}

fn save_net<B: Backend, M: Module<B>>(
    net: &M,
    path: PathBuf,
    recorder: &BinFileRecorder<FullPrecisionSettings>,
) -> Result<()> {
    net.clone()
        .save_file(path, recorder)
        .map_err(|e| BboError::Recorder(e.to_string()))
}

fn load_net<B: Backend, M: Module<B>>(
    template: M,
    path: PathBuf,
    recorder: &BinFileRecorder<FullPrecisionSettings>,
    device: &B::Device,
) -> Result<M> {
    template
        .load_file(path, recorder, device)
        .map_err(|e| BboError::Recorder(e.to_string()))
}

// ============================================================================
// Training passes
// ============================================================================

struct Trainer<'a, B: Backend> {
    view: &'a ReplayView,
    settings: &'a FitSettings,
    minibatches: usize,
    epochs: usize,
    device: &'a B::Device,
}

impl<'a, B: AutodiffBackend> Trainer<'a, B> {
    fn batch_size(&self) -> usize {
        self.settings.max_batch
    }

    /// Anchor indices for one epoch, without replacement.
    fn epoch_indices(&self, rng: &mut StdRng) -> Vec<usize> {
        sample(rng, self.view.len(), self.minibatches * self.batch_size()).into_vec()
    }

    fn fit_value(&self, fit: &mut NetFit<B, ValueNet<B>>, rng: &mut StdRng) -> Result<f32> {
        let dim = self.view.dim;
        let mut total = 0.0f32;

        for _ in 0..self.epochs {
            let indices = self.epoch_indices(rng);
            for batch in indices.chunks(self.batch_size()) {
                let n = batch.len();
                let points: Vec<f32> = batch.iter().flat_map(|&i| self.view.policy(i)).copied().collect();
                let rewards: Vec<f32> = batch.iter().map(|&i| self.view.rewards[i]).collect();

                let x = points_tensor::<B>(&points, n, dim, self.device);
                let target = Tensor::<B, 1>::from_floats(rewards.as_slice(), self.device);
                let prediction = fit.net.forward(x).reshape([n]);

                let loss = pair_loss(prediction, target, None, self.settings.loss, self.settings.reduction);
                total += fit.step(loss)?;
            }
        }
        Ok(total / self.epochs.max(1) as f32)
    }

    /// First-order pair matching. `curvature` carries the midpoint switch for
    /// the second-order correction.
    fn fit_pairs(
        &self,
        fit: &mut NetFit<B, DerivativeNet<B>>,
        curvature: Option<bool>,
        rng: &mut StdRng,
    ) -> Result<f32> {
        let dim = self.view.dim;
        let n_explore = self.view.n_explore;
        let len = self.view.len();
        let mut total = 0.0f32;

        for _ in 0..self.epochs {
            let indices = self.epoch_indices(rng);
            for batch in indices.chunks(self.batch_size()) {
                let n = batch.len();
                let mut anchors = Vec::with_capacity(n * dim);
                let mut deltas = Vec::with_capacity(n * dim);
                let mut midpoints = Vec::with_capacity(n * dim);
                let mut diffs = Vec::with_capacity(n);
                let mut weights = Vec::with_capacity(n);

                for &i in batch {
                    let j = ((i / n_explore) * n_explore + rng.gen_range(0..n_explore)).min(len - 1);
                    let (p_i, p_j) = (self.view.policy(i), self.view.policy(j));

                    let mut norm = 0.0f32;
                    for (a, b) in p_i.iter().zip(p_j) {
                        anchors.push(*a);
                        deltas.push(b - a);
                        midpoints.push(0.5 * (a + b));
                        norm += (b - a) * (b - a);
                    }
                    diffs.push(self.view.rewards[j] - self.view.rewards[i]);
                    weights.push(pair_weight(norm.sqrt()));
                }

                let x = points_tensor::<B>(&anchors, n, dim, self.device);
                let delta = points_tensor::<B>(&deltas, n, dim, self.device);
                let mut target = Tensor::<B, 1>::from_floats(diffs.as_slice(), self.device);

                if let Some(midpoint) = curvature {
                    let at = if midpoint {
                        points_tensor::<B>(&midpoints, n, dim, self.device)
                    } else {
                        x.clone()
                    };
                    target = target - curvature_correction(&fit.net, at, delta.clone());
                }

                let prediction = (fit.net.forward(x) * delta).sum_dim(1).reshape([n]);
                let weights = self
                    .settings
                    .importance_sampling
                    .then(|| Tensor::<B, 1>::from_floats(weights.as_slice(), self.device));

                let loss = pair_loss(prediction, target, weights, self.settings.loss, self.settings.reduction);
                total += fit.step(loss)?;
            }
        }
        Ok(total / self.epochs.max(1) as f32)
    }

    /// Derivative fit on synthetic offsets scored by the value network.
    fn fit_anchor(
        &self,
        value_net: &ValueNet<B>,
        fit: &mut NetFit<B, DerivativeNet<B>>,
        perturbation: f32,
        rng: &mut StdRng,
    ) -> Result<f32> {
        let dim = self.view.dim;
        let len = self.view.len();
        let mut total = 0.0f32;

        for _ in 0..self.epochs {
            for _ in 0..self.minibatches {
                let n = self.batch_size();
                let mut anchors = Vec::with_capacity(n * dim);
                let mut offsets = Vec::with_capacity(n * dim);
                let mut perturbed = Vec::with_capacity(n * dim);
                let mut rewards = Vec::with_capacity(n);
                let mut weights = Vec::with_capacity(n);

                for _ in 0..n {
                    let i = rng.gen_range(0..len);
                    let mut norm = 0.0f32;
                    for &p in self.view.policy(i) {
                        let d = perturbation * rng.sample::<f32, _>(StandardNormal);
                        anchors.push(p);
                        offsets.push(d);
                        perturbed.push(p + d);
                        norm += d * d;
                    }
                    rewards.push(self.view.rewards[i]);
                    weights.push(pair_weight(norm.sqrt()));
                }

                let x = points_tensor::<B>(&anchors, n, dim, self.device);
                let delta = points_tensor::<B>(&offsets, n, dim, self.device);
                let x_prime = points_tensor::<B>(&perturbed, n, dim, self.device);
                let r = Tensor::<B, 1>::from_floats(rewards.as_slice(), self.device);

                let target = (value_net.forward(x_prime).reshape([n]) - r).detach();
                let prediction = (fit.net.forward(x) * delta).sum_dim(1).reshape([n]);
                let weights = self
                    .settings
                    .importance_sampling
                    .then(|| Tensor::<B, 1>::from_floats(weights.as_slice(), self.device));

                let loss = pair_loss(prediction, target, weights, self.settings.loss, self.settings.reduction);
                total += fit.step(loss)?;
            }
        }
        Ok(total / self.epochs.max(1) as f32)
    }
}

/// Second-order term `0.5·Δᵀ∇(g·Δ)` evaluated at `at`, one value per row.
///
/// The input gradient of `g·Δ` is `J_gᵀΔ`, so this is the quadratic form of
/// the learned Jacobian along each pair offset. Detached.
pub(crate) fn curvature_correction<B: AutodiffBackend>(
    net: &DerivativeNet<B>,
    at: Tensor<B, 2>,
    delta: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [n, _] = delta.dims();
    let (_, hessian_delta) = net.forward_with_input_grad(at, delta.clone());
    (delta * hessian_delta).sum_dim(1).reshape([n]).mul_scalar(0.5).detach()
}

// ============================================================================
// Host <-> tensor helpers
// ============================================================================

fn points_tensor<B: Backend>(flat: &[f32], n: usize, dim: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(flat, device).reshape([n, dim])
}

pub(crate) fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| BboError::Tensor(format!("{:?}", e)))
}

fn first_value<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32> {
    to_host(tensor)?
        .first()
        .copied()
        .ok_or_else(|| BboError::Tensor("empty scalar tensor".into()))
}
