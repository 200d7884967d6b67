//! The trust-region minimization loop.
//!
//! # State machine
//!
//! ```text
//!   ┌────────┐      ┌──────────────────────┐
//!   │ WARMUP │ ───► │ EXPLORE → FIT → STEP │ ◄──┐
//!   └────────┘      └──────────┬───────────┘    │ continue / flush
//!        ▲                     │────────────────┘
//!        │ shrink & restart    ├──► success  ──► Done
//!        └─────────────────────┤
//!                              └──► budget   ──► Failed
//! ```
//!
//! Each call to [`TrustRegionMinimizer::step`] runs one round (preceded by a
//! warmup at the start of the run and after every restart) and reports what
//! happened. The minimizer is also an [`Iterator`] over those outcomes.
//!
//! Transitions are checked in order: success, shrink-and-restart, budget,
//! flush. A flush happens whenever the frame counter hits a multiple of
//! `printing_interval * n_explore`.

use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::checkpoint::{checkpoint_stem, CheckpointStore, MemoryCheckpoints};
use crate::config::AgentConfig;
use crate::core::{ReplayBuffer, RobustNormalizer, SampleSet, TrustRegion};
use crate::error::{BboError, ConfigError, Result};
use crate::metrics::{keys, MemoryRecorder, MetricsLogger, MetricsRecorder, ResultsSnapshot, RoundReport, RoundResults, Series};
use crate::objective::Objective;
use crate::scheduling::ExponentialDecay;
use crate::surrogate::{FitReport, SurrogateModel};

use super::exploration::{
    argmin, clip_norm, l2_distance, l2_norm, perturb, replace_non_finite, uniform_box,
};
use super::state::{AgentState, Phase};

/// Weight of the newest gradient in the running mean gradient.
const MEAN_GRAD_RATE: f32 = 0.1;

/// Why a run ended without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    BudgetExhausted { frame: usize },
}

/// Result of one [`TrustRegionMinimizer::step`].
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Round finished, loop continues. Carries the flushed snapshot on flush rounds.
    Continue(RoundReport),
    /// Progress stalled: the trust region was squeezed and the next step warms up again.
    Restarted(RoundReport),
    /// The objective was solved. Carries the final flushed results.
    Done(ResultsSnapshot),
    /// The run ended without success.
    Failed(FailureReason),
}

impl RoundOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundOutcome::Done(_) | RoundOutcome::Failed(_))
    }

    pub fn report(&self) -> Option<&RoundReport> {
        match self {
            RoundOutcome::Continue(r) | RoundOutcome::Restarted(r) => Some(r),
            _ => None,
        }
    }
}

/// Trust-region black-box minimizer over an [`Objective`].
///
/// # Type Parameters
///
/// - `B`: Autodiff backend for the surrogate networks (e.g., `Autodiff<NdArray>`)
/// - `O`: The objective
pub struct TrustRegionMinimizer<B: AutodiffBackend, O: Objective> {
    config: AgentConfig,
    objective: O,
    surrogate: SurrogateModel<B>,
    trust_region: TrustRegion,
    normalizer: RobustNormalizer,
    replay: ReplayBuffer,
    /// Real-coordinate exploration samples since the last flush.
    history: SampleSet,
    results: RoundResults,
    recorder: Box<dyn MetricsRecorder>,
    checkpoints: Box<dyn CheckpointStore>,
    epsilon: ExponentialDecay,
    pi_lr: ExponentialDecay,
    rng: StdRng,

    phase: Phase,
    /// Policy in unconstrained coordinates.
    pi: Vec<f32>,
    mean_grad: Vec<f32>,
    frame: usize,
    round: usize,
    counter: usize,
    divergence: usize,
    no_change: usize,
    best_pi_evaluate: f32,
    best_point: Option<Vec<f32>>,
    reward_pi: f32,
    f0: f32,
    last_fit: FitReport,
    last_snapshot: Option<ResultsSnapshot>,
}

impl<B: AutodiffBackend, O: Objective> TrustRegionMinimizer<B, O> {
    /// Validate the configuration and set up a run starting from the domain center.
    ///
    /// Results and checkpoints are kept in memory until replaced with
    /// [`with_recorder`](Self::with_recorder) / [`with_checkpoints`](Self::with_checkpoints).
    pub fn new(config: AgentConfig, mut objective: O, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let dim = objective.dim();
        if dim == 0 {
            return Err(ConfigError::InvalidParam {
                param: "dim",
                message: "objective must have at least one dimension".into(),
            }
            .into());
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let surrogate = SurrogateModel::new(&config, dim, &mut rng, device);
        let trust_region = TrustRegion::new(dim, config.domain, config.contraction);

        objective.reset();
        let pi = vec![0.0; dim];
        let start = trust_region.clamp_to_domain(&trust_region.unconstrained_to_real(&pi));
        let f0 = objective.value(&start);
        if !f0.is_finite() {
            return Err(BboError::NonFiniteRewards { frame: 0 });
        }

        let mut results = RoundResults::new();
        results.push_scalar(keys::F0, f0 as f64);

        log::info!(
            "Trust-region minimizer: method={}, dim={}, budget={}, f0={:.6e}",
            config.method,
            dim,
            config.budget,
            f0
        );

        Ok(Self {
            normalizer: RobustNormalizer::new(config.normalizer_momentum),
            replay: ReplayBuffer::new(dim, config.replay_memory_size, config.n_explore),
            history: SampleSet::new(dim),
            results,
            recorder: Box::new(MemoryRecorder::new()),
            checkpoints: Box::new(MemoryCheckpoints::new()),
            epsilon: ExponentialDecay::new(config.epsilon, config.epsilon_factor),
            pi_lr: ExponentialDecay::new(config.pi_lr, config.pi_lr_factor),
            rng,
            phase: Phase::Warmup,
            pi,
            mean_grad: Vec::new(),
            frame: 0,
            round: 0,
            counter: 0,
            divergence: 0,
            no_change: 0,
            best_pi_evaluate: f0,
            best_point: Some(start),
            reward_pi: f0,
            f0,
            last_fit: FitReport::default(),
            last_snapshot: None,
            config,
            objective,
            surrogate,
            trust_region,
        })
    }

    /// Persist flushed results to `recorder`.
    pub fn with_recorder<R: MetricsRecorder + 'static>(mut self, recorder: R) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    /// Write checkpoints to `store`.
    pub fn with_checkpoints<S: CheckpointStore + 'static>(mut self, store: S) -> Self {
        self.checkpoints = Box::new(store);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn trust_region(&self) -> &TrustRegion {
        &self.trust_region
    }

    pub fn normalizer(&self) -> &RobustNormalizer {
        &self.normalizer
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn surrogate(&self) -> &SurrogateModel<B> {
        &self.surrogate
    }

    pub fn recorder(&self) -> &dyn MetricsRecorder {
        self.recorder.as_ref()
    }

    pub fn checkpoints(&self) -> &dyn CheckpointStore {
        self.checkpoints.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Policy in unconstrained coordinates.
    pub fn pi(&self) -> &[f32] {
        &self.pi
    }

    /// Policy in real coordinates, clamped to the domain.
    pub fn real_pi(&self) -> Vec<f32> {
        self.trust_region
            .clamp_to_domain(&self.trust_region.unconstrained_to_real(&self.pi))
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn divergence(&self) -> usize {
        self.divergence
    }

    pub fn no_change(&self) -> usize {
        self.no_change
    }

    pub fn best_pi_evaluate(&self) -> f32 {
        self.best_pi_evaluate
    }

    /// Real-coordinate point of [`best_pi_evaluate`](Self::best_pi_evaluate).
    pub fn best_point(&self) -> Option<&[f32]> {
        self.best_point.as_deref()
    }

    pub fn f0(&self) -> f32 {
        self.f0
    }

    /// Current exploration magnitude.
    pub fn epsilon(&self) -> f32 {
        self.epsilon.value_at(self.divergence)
    }

    /// Current policy step size.
    pub fn pi_lr(&self) -> f32 {
        self.pi_lr.value_at(self.divergence)
    }

    /// Most recently persisted results.
    pub fn last_snapshot(&self) -> Option<&ResultsSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Results accumulated since the last flush.
    pub fn pending_results(&self) -> ResultsSnapshot {
        self.results.snapshot()
    }

    // ========================================================================
    // Loop
    // ========================================================================

    /// Run one round.
    ///
    /// # Errors
    ///
    /// [`BboError::Finished`] once a terminal outcome was returned, plus any
    /// training or persistence error.
    pub fn step(&mut self) -> Result<RoundOutcome> {
        match self.phase {
            Phase::Finished => return Err(BboError::Finished),
            Phase::Warmup => {
                self.warmup()?;
                self.phase = Phase::Explore;
            }
            Phase::Explore => {}
        }

        self.round += 1;
        // The first round of a run does not count toward patience.
        if self.round > 1 {
            self.counter += 1;
        }
        let dim = self.pi.len();

        // Explore.
        let explore = perturb(&self.pi, self.config.n_explore, self.epsilon(), &mut self.rng);
        let rewards = self.evaluate_batch(&explore)?;
        if self.config.best_explore_update {
            if let Some(best) = argmin(&rewards) {
                self.pi = explore[best * dim..(best + 1) * dim].to_vec();
            }
        }

        // Fit.
        self.normalizer.update(&rewards, true);
        self.replay.extend(&explore, &rewards)?;
        let normalizer = &self.normalizer;
        let view = self.replay.view(|r| normalizer.normalize(r));
        self.last_fit = self
            .surrogate
            .fit_surrogate(&view, self.config.value_iter, &mut self.rng)?;

        // Step.
        let grad = self.surrogate.gradient_at(&self.pi)?;
        let grad_norm = l2_norm(&grad);
        let step = match self.config.max_pi_grad_norm {
            Some(max_norm) => clip_norm(&grad, max_norm),
            None => grad.clone(),
        };
        let pi_lr = self.pi_lr();
        for (p, g) in self.pi.iter_mut().zip(&step) {
            *p -= pi_lr * g;
        }
        self.update_mean_grad(&grad);

        // Evaluate.
        let real_pi = self.real_pi();
        self.reward_pi = self.objective.value(&real_pi);
        if !self.reward_pi.is_finite() {
            let worst = rewards.iter().copied().fold(f32::MIN, f32::max);
            log::warn!(
                "Policy value {} at frame {} is not finite; counted as {:.6e}",
                self.reward_pi,
                self.frame,
                worst
            );
            self.reward_pi = worst;
        }
        if self.reward_pi < self.best_pi_evaluate {
            self.no_change = 0;
            self.best_pi_evaluate = self.reward_pi;
            self.best_point = Some(real_pi.clone());
        } else {
            self.no_change += 1;
        }

        self.results
            .push_scalar(keys::REWARD_PI_EVALUATE, self.reward_pi as f64);
        self.results
            .push_scalar(keys::FRAME_PI_EVALUATE, self.frame as f64);
        self.results.push_row(keys::POLICIES, real_pi);
        if let Some(loss) = self.last_fit.value_loss {
            self.results.push_scalar(keys::VALUE_LOSS, loss as f64);
        }
        if let Some(loss) = self.last_fit.derivative_loss {
            self.results.push_scalar(keys::DERIVATIVE_LOSS, loss as f64);
        }

        let mut report = self.report(grad_norm);
        log::debug!(
            "Round {} frame {}: pi={:.6e} best={:.6e} |grad|={:.4} no_change={}",
            self.round,
            self.frame,
            self.reward_pi,
            self.best_pi_evaluate,
            grad_norm,
            self.no_change
        );

        // Transitions.
        if self.is_solved() {
            let snapshot = self.persist()?;
            self.phase = Phase::Finished;
            log::info!(
                "Finished successfully at frame {} (best {:.6e})",
                self.frame,
                self.best_pi_evaluate
            );
            return Ok(RoundOutcome::Done(snapshot));
        }

        if self.counter > self.config.patience && self.no_change > self.config.patience {
            self.counter = 0;
            self.divergence += 1;
            report.flushed = Some(self.flush_results()?);
            self.shrink()?;
            self.phase = Phase::Warmup;
            self.save_checkpoint()?;
            report.divergence = self.divergence;
            report.epsilon = self.epsilon();
            report.pi_lr = self.pi_lr();
            report.min_trust_sigma = self.trust_region.min_sigma();
            return Ok(RoundOutcome::Restarted(report));
        }

        if self.frame >= self.config.budget {
            self.persist()?;
            self.phase = Phase::Finished;
            log::info!(
                "Failed: budget exhausted at frame {} (best {:.6e})",
                self.frame,
                self.best_pi_evaluate
            );
            return Ok(RoundOutcome::Failed(FailureReason::BudgetExhausted { frame: self.frame }));
        }

        if self.frame % self.config.flush_frames() == 0 {
            self.history.clear();
            report.flushed = Some(self.persist()?);
        }

        Ok(RoundOutcome::Continue(report))
    }

    /// Drive the loop to a terminal outcome, logging every round.
    pub fn run(&mut self, logger: &mut dyn MetricsLogger) -> Result<RoundOutcome> {
        loop {
            let outcome = self.step()?;
            if let Some(report) = outcome.report() {
                logger.log(report);
            }
            if outcome.is_terminal() {
                logger.flush();
                return Ok(outcome);
            }
        }
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Snapshot of the loop state.
    pub fn state(&self) -> AgentState {
        AgentState {
            method: self.config.method,
            phase: self.phase,
            frame: self.frame,
            round: self.round,
            counter: self.counter,
            divergence: self.divergence,
            no_change: self.no_change,
            epsilon: self.epsilon(),
            pi_lr: self.pi_lr(),
            pi: self.pi.clone(),
            mean_grad: self.mean_grad.clone(),
            trust_region: self.trust_region.clone(),
            normalizer: self.normalizer.clone(),
            replay: self.replay.clone(),
            history: self.history.clone(),
            best_pi_evaluate: self.best_pi_evaluate,
            best_point: self.best_point.clone(),
            reward_pi: self.reward_pi,
            f0: self.f0,
        }
    }

    /// Continue from a saved state. Surrogate weights are left untouched.
    pub fn resume(&mut self, state: AgentState) -> Result<()> {
        if state.method != self.config.method {
            return Err(ConfigError::InvalidParam {
                param: "method",
                message: format!(
                    "checkpoint was taken with {}, minimizer runs {}",
                    state.method, self.config.method
                ),
            }
            .into());
        }
        if state.pi.len() != self.pi.len() || state.trust_region.dim() != self.pi.len() {
            return Err(BboError::DimensionMismatch {
                expected: self.pi.len(),
                actual: state.pi.len(),
            });
        }

        self.phase = state.phase;
        self.frame = state.frame;
        self.round = state.round;
        self.counter = state.counter;
        self.divergence = state.divergence;
        self.no_change = state.no_change;
        self.pi = state.pi;
        self.mean_grad = state.mean_grad;
        self.trust_region = state.trust_region;
        self.normalizer = state.normalizer;
        self.replay = state.replay;
        self.history = state.history;
        self.best_pi_evaluate = state.best_pi_evaluate;
        self.best_point = state.best_point;
        self.reward_pi = state.reward_pi;
        self.f0 = state.f0;
        self.results.clear();

        log::info!(
            "Resumed at frame {} (round {}, {} restarts)",
            self.frame,
            self.round,
            self.divergence
        );
        Ok(())
    }

    /// Load checkpoint `tag` from the store, including surrogate weights when
    /// the store keeps them on disk.
    pub fn resume_from(&mut self, tag: usize) -> Result<()> {
        let state = self.checkpoints.load(tag)?;
        self.resume(state)?;
        if let Some(dir) = self.checkpoints.weights_dir() {
            self.surrogate.load_weights(dir, &checkpoint_stem(tag))?;
        }
        Ok(())
    }

    fn save_checkpoint(&mut self) -> Result<()> {
        let state = self.state();
        self.checkpoints.save(self.frame, &state)?;
        if let Some(dir) = self.checkpoints.weights_dir() {
            self.surrogate.save_weights(dir, &checkpoint_stem(self.frame))?;
        }
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Reset the learned state and reseed the replay from the surviving
    /// history plus a fresh uniform batch.
    fn warmup(&mut self) -> Result<()> {
        self.surrogate.reset(&mut self.rng);
        self.normalizer.reset();
        self.mean_grad.clear();

        let region = &self.trust_region;
        let kept = self
            .history
            .filter_in_trust_region(region.mu(), region.min_sigma())
            .map_policies(|x| region.real_to_unconstrained(x));

        let random = uniform_box(self.pi.len(), self.config.warmup_explore, &mut self.rng);
        let rewards = self.evaluate_batch(&random)?;

        self.replay.clear();
        self.replay.extend_set(&kept)?;
        self.replay.extend(&random, &rewards)?;

        let normalizer = &mut self.normalizer;
        let view = self.replay.view(|r| normalizer.update(r, true));
        self.last_fit = self
            .surrogate
            .fit_surrogate(&view, self.config.warmup_epochs, &mut self.rng)?;

        log::debug!(
            "Warmup at frame {}: {} samples kept from history, replay holds {}",
            self.frame,
            kept.len(),
            self.replay.len()
        );
        Ok(())
    }

    /// Evaluate unconstrained points on the objective (counted) and record them.
    fn evaluate_batch(&mut self, unconstrained: &[f32]) -> Result<Vec<f32>> {
        let dim = self.pi.len();
        let n = unconstrained.len() / dim;
        let real = self
            .trust_region
            .clamp_to_domain(&self.trust_region.batch_to_real(unconstrained));

        let mut rewards = self.objective.evaluate(&real);
        if rewards.len() != n {
            return Err(BboError::DimensionMismatch {
                expected: n,
                actual: rewards.len(),
            });
        }
        match replace_non_finite(&mut rewards) {
            None => return Err(BboError::NonFiniteRewards { frame: self.frame }),
            Some(0) => {}
            Some(replaced) => log::warn!(
                "{} of {} rewards at frame {} were not finite; replaced by the batch maximum",
                replaced,
                n,
                self.frame
            ),
        }
        self.frame += n;

        self.history.push_batch(&real, &rewards)?;
        self.results.push_rows(keys::EXPLORE_POLICIES, &real, dim);
        self.results.push_scalars(keys::REWARDS, &rewards);
        Ok(rewards)
    }

    fn update_mean_grad(&mut self, grad: &[f32]) {
        if self.mean_grad.len() != grad.len() {
            self.mean_grad = grad.to_vec();
        } else {
            for (m, g) in self.mean_grad.iter_mut().zip(grad) {
                *m += MEAN_GRAD_RATE * (g - *m);
            }
        }
    }

    fn is_solved(&self) -> bool {
        if self.objective.solved() {
            return true;
        }
        self.objective
            .optimum()
            .map(|opt| self.best_pi_evaluate - opt.value < -self.config.success_margin)
            .unwrap_or(false)
    }

    fn report(&self, grad_norm: f32) -> RoundReport {
        let mut report = RoundReport::new(self.round, self.frame, self.reward_pi, self.best_pi_evaluate);
        report.best_observed = self.objective.best_observed();
        report.value_loss = self.last_fit.value_loss;
        report.derivative_loss = self.last_fit.derivative_loss;
        report.grad_norm = grad_norm;
        report.epsilon = self.epsilon();
        report.pi_lr = self.pi_lr();
        report.min_trust_sigma = self.trust_region.min_sigma();
        report.no_change = self.no_change;
        report.divergence = self.divergence;
        report
    }

    /// Checkpoint, then flush the results.
    fn persist(&mut self) -> Result<ResultsSnapshot> {
        self.save_checkpoint()?;
        self.flush_results()
    }

    /// Append per-flush summaries and hand the accumulated results to the
    /// recorder.
    fn flush_results(&mut self) -> Result<ResultsSnapshot> {
        self.record_summary()?;
        let snapshot = self.results.take();
        self.recorder.append(&snapshot)?;
        log::debug!("Persisted {} series at frame {}", snapshot.len(), self.frame);
        self.last_snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn record_summary(&mut self) -> Result<()> {
        let grad = self.surrogate.gradient_at(&self.pi)?;
        let value = self.surrogate.value_at(&self.pi)?;
        let real_pi = self.real_pi();
        let r = &mut self.results;

        r.push_scalar(keys::FRAME, self.frame as f64);
        if let Some(best) = self.objective.best_observed() {
            r.push_scalar(keys::BEST_OBSERVED, best as f64);
        }
        r.push_scalar(keys::BEST_PI_EVALUATE, self.best_pi_evaluate as f64);
        r.push_scalar(keys::GRAD_NORM, l2_norm(&grad) as f64);
        r.push_row(keys::GRAD, grad);

        if let Some(opt) = self.objective.optimum() {
            let dist_x = l2_distance(
                &self.objective.denormalize(&real_pi),
                &self.objective.denormalize(&opt.point),
            );
            let in_trust = self.trust_region.contains(&opt.point);
            r.push_scalar(keys::DIST_X, dist_x as f64);
            r.push_scalar(keys::IN_TRUST, if in_trust { 1.0 } else { 0.0 });
            r.push_scalar(keys::DIST_F, (self.reward_pi - opt.value) as f64);
        }

        if let Some(v) = value {
            r.push_scalar(keys::VALUE, self.normalizer.desquash(v) as f64);
        }
        if !self.mean_grad.is_empty() {
            r.push_row(keys::MEAN_GRAD, self.mean_grad.clone());
        }
        r.push_scalar(keys::DIVERGENCE, self.divergence as f64);
        r.push_scalar(keys::R_NORM_MEAN, self.normalizer.location());
        r.push_scalar(keys::R_NORM_SIGMA, self.normalizer.scale());
        r.push_scalar(keys::MIN_TRUST_SIGMA, self.trust_region.min_sigma() as f64);
        r.push_scalar(keys::NO_CHANGE, self.no_change as f64);
        r.push_scalar(keys::EPSILON, self.epsilon.value_at(self.divergence) as f64);
        Ok(())
    }

    /// Squeeze onto the best persisted point and move the policy there.
    fn shrink(&mut self) -> Result<()> {
        let point = self
            .restart_point()?
            .or_else(|| self.best_point.clone())
            .unwrap_or_else(|| self.trust_region.mu().to_vec());

        self.trust_region.squeeze(&point);
        self.pi = self.trust_region.real_to_unconstrained(&point);

        log::info!(
            "Restart {} at frame {}: min sigma {:.3e}, epsilon {:.3e}, pi_lr {:.3e}",
            self.divergence,
            self.frame,
            self.trust_region.min_sigma(),
            self.epsilon(),
            self.pi_lr()
        );
        Ok(())
    }

    /// Lower of the best evaluated policy and the best explored sample over
    /// the whole persisted history.
    fn restart_point(&self) -> Result<Option<Vec<f32>>> {
        let evaluated = best_row(
            self.recorder.load(keys::REWARD_PI_EVALUATE)?,
            self.recorder.load(keys::POLICIES)?,
        );
        let explored = best_row(
            self.recorder.load(keys::REWARDS)?,
            self.recorder.load(keys::EXPLORE_POLICIES)?,
        );

        Ok(match (evaluated, explored) {
            (Some((f_eval, p_eval)), Some((f_explore, p_explore))) => {
                Some(if f_eval <= f_explore { p_eval } else { p_explore })
            }
            (evaluated, explored) => evaluated.or(explored).map(|(_, p)| p),
        })
    }
}

/// Row paired with the smallest value.
fn best_row(values: Option<Series>, rows: Option<Series>) -> Option<(f64, Vec<f32>)> {
    let values = values?;
    let rows = rows?;
    let (value, row) = values
        .as_scalars()?
        .iter()
        .zip(rows.as_rows()?)
        .filter(|(v, _)| !v.is_nan())
        .min_by(|a, b| a.0.total_cmp(b.0))?;
    Some((*value, row.clone()))
}

impl<B: AutodiffBackend, O: Objective> Iterator for TrustRegionMinimizer<B, O> {
    type Item = Result<RoundOutcome>;

    /// Yields every outcome up to and including the terminal one. An error
    /// also ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.phase == Phase::Finished {
            return None;
        }
        let outcome = self.step();
        if outcome.is_err() {
            self.phase = Phase::Finished;
        }
        Some(outcome)
    }
}
