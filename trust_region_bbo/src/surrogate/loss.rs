//! Pair losses for surrogate training.
//!
//! Every surrogate fit reduces to matching a prediction vector against a
//! target vector, optionally weighted per element. The elementwise loss is
//! squared error or Huber, reduced by mean or sum.

use burn::tensor::{backend::Backend, Tensor};

use crate::config::{LossKind, LossReduction};

/// Weighted elementwise loss reduced to a single-element tensor.
///
/// # Arguments
///
/// * `prediction` - Model output: [batch_size]
/// * `target` - Detached target: [batch_size]
/// * `weights` - Optional per-element weights: [batch_size]
pub fn pair_loss<B: Backend>(
    prediction: Tensor<B, 1>,
    target: Tensor<B, 1>,
    weights: Option<Tensor<B, 1>>,
    kind: LossKind,
    reduction: LossReduction,
) -> Tensor<B, 1> {
    let diff = prediction - target;

    let elementwise = match kind {
        LossKind::Mse => diff.powf_scalar(2.0),
        LossKind::Huber { delta } => {
            // 0.5 * min(|d|, delta)^2 + delta * (|d| - min(|d|, delta))
            let abs = diff.abs();
            let quadratic = abs.clone().clamp_max(delta);
            let linear = abs - quadratic.clone();
            quadratic.powf_scalar(2.0).mul_scalar(0.5) + linear.mul_scalar(delta)
        }
    };

    let weighted = match weights {
        Some(w) => elementwise * w,
        None => elementwise,
    };

    match reduction {
        LossReduction::Mean => weighted.mean(),
        LossReduction::Sum => weighted.sum(),
    }
}

/// Importance weight of a pair at distance `distance`: `clamp(1 / (d + 1e-4), 0, 1)`.
pub fn pair_weight(distance: f32) -> f32 {
    (1.0 / (distance + 1e-4)).clamp(0.0, 1.0)
}
