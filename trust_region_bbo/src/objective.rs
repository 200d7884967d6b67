//! Objective abstraction.
//!
//! The minimizer only ever sees an objective through [`Objective`]: it hands
//! over batches of real-coordinate points inside the normalized domain and
//! gets one scalar per point back. Lower is better.

/// Known global optimum, in normalized coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub point: Vec<f32>,
    pub value: f32,
}

/// A black-box objective to minimize.
pub trait Objective {
    /// Dimension of the search space.
    fn dim(&self) -> usize;

    /// Evaluate a batch of points, flattened row-major as `[n * dim]`.
    ///
    /// Counted: every point consumes budget and may update the best record.
    fn evaluate(&mut self, policies: &[f32]) -> Vec<f32>;

    /// Evaluate a single point without consuming budget.
    fn value(&mut self, policy: &[f32]) -> f32;

    /// Clear evaluation counters and best record.
    fn reset(&mut self) {}

    /// Best counted evaluation so far.
    fn best_observed(&self) -> Option<f32>;

    /// Point of the best counted evaluation.
    fn best_point(&self) -> Option<Vec<f32>>;

    /// Counted evaluations so far.
    fn evaluations(&self) -> usize;

    /// Whether the objective considers itself solved.
    fn solved(&self) -> bool {
        false
    }

    fn optimum(&self) -> Option<Optimum> {
        None
    }

    /// Map a normalized point to the objective's native coordinates.
    fn denormalize(&self, policy: &[f32]) -> Vec<f32> {
        policy.to_vec()
    }
}

impl<O: Objective + ?Sized> Objective for Box<O> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn evaluate(&mut self, policies: &[f32]) -> Vec<f32> {
        (**self).evaluate(policies)
    }

    fn value(&mut self, policy: &[f32]) -> f32 {
        (**self).value(policy)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn best_observed(&self) -> Option<f32> {
        (**self).best_observed()
    }

    fn best_point(&self) -> Option<Vec<f32>> {
        (**self).best_point()
    }

    fn evaluations(&self) -> usize {
        (**self).evaluations()
    }

    fn solved(&self) -> bool {
        (**self).solved()
    }

    fn optimum(&self) -> Option<Optimum> {
        (**self).optimum()
    }

    fn denormalize(&self, policy: &[f32]) -> Vec<f32> {
        (**self).denormalize(policy)
    }
}

/// Adapter turning a closure into an [`Objective`].
///
/// Tracks the evaluation count and best record. Reports solved once a
/// counted evaluation comes within `tolerance` of a known optimum.
pub struct FnObjective<F> {
    dim: usize,
    f: F,
    evaluations: usize,
    best: Option<(f32, Vec<f32>)>,
    optimum: Option<Optimum>,
    tolerance: f32,
}

impl<F: FnMut(&[f32]) -> f32> FnObjective<F> {
    pub fn new(dim: usize, f: F) -> Self {
        Self {
            dim,
            f,
            evaluations: 0,
            best: None,
            optimum: None,
            tolerance: 1e-8,
        }
    }

    pub fn with_optimum(mut self, point: Vec<f32>, value: f32) -> Self {
        self.optimum = Some(Optimum { point, value });
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl<F: FnMut(&[f32]) -> f32> Objective for FnObjective<F> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn evaluate(&mut self, policies: &[f32]) -> Vec<f32> {
        let mut rewards = Vec::with_capacity(policies.len() / self.dim.max(1));
        for point in policies.chunks_exact(self.dim) {
            let r = (self.f)(point);
            self.evaluations += 1;
            if self.best.as_ref().map_or(true, |(b, _)| r < *b) {
                self.best = Some((r, point.to_vec()));
            }
            rewards.push(r);
        }
        rewards
    }

    fn value(&mut self, policy: &[f32]) -> f32 {
        (self.f)(policy)
    }

    fn reset(&mut self) {
        self.evaluations = 0;
        self.best = None;
    }

    fn best_observed(&self) -> Option<f32> {
        self.best.as_ref().map(|(b, _)| *b)
    }

    fn best_point(&self) -> Option<Vec<f32>> {
        self.best.as_ref().map(|(_, p)| p.clone())
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn solved(&self) -> bool {
        match (&self.optimum, self.best_observed()) {
            (Some(opt), Some(best)) => best - opt.value < self.tolerance,
            _ => false,
        }
    }

    fn optimum(&self) -> Option<Optimum> {
        self.optimum.clone()
    }
}
