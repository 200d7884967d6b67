//! Test suite for the surrogate submodule.
//!
//! Test categories:
//! 1. Every method trains to a finite loss
//! 2. Minibatch formation errors
//! 3. Input gradients against finite differences
//! 4. Fitting a linear objective recovers its gradient
//! 5. Weight persistence
//! 6. Second-order curvature correction

use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::fitter::curvature_correction;
use super::*;
use crate::config::{AgentConfig, LossKind, LossReduction, SurrogateMethod};
use crate::core::{ReplayBuffer, ReplayView};
use crate::error::BboError;

type TestBackend = Autodiff<NdArray<f32>>;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn small_config(method: SurrogateMethod) -> AgentConfig {
    AgentConfig::new()
        .with_method(method)
        .with_n_explore(8)
        .with_warmup_explore(32)
        .with_max_batch(16)
        .with_network(16, 2)
        .with_surrogate_lr(1e-2)
}

/// `n` samples of `f` drawn uniformly from [-1, 1]^dim.
fn view_of<F: Fn(&[f32]) -> f32>(dim: usize, n: usize, n_explore: usize, seed: u64, f: F) -> ReplayView {
    let mut rng = StdRng::seed_from_u64(seed);
    let policies: Vec<f32> = (0..n * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let rewards: Vec<f32> = policies.chunks(dim).map(|p| f(p)).collect();

    let mut buffer = ReplayBuffer::new(dim, n, n_explore);
    buffer.extend(&policies, &rewards).unwrap();
    buffer.view(|r| r.to_vec())
}

fn sphere(p: &[f32]) -> f32 {
    p.iter().map(|x| x * x).sum()
}

fn model(config: &AgentConfig, dim: usize, seed: u64) -> SurrogateModel<TestBackend> {
    let mut rng = StdRng::seed_from_u64(seed);
    SurrogateModel::new(config, dim, &mut rng, &Default::default())
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

// =============================================================================
// 1. Every method trains
// =============================================================================

#[test]
fn test_every_method_reports_finite_losses() {
    let view = view_of(2, 32, 8, 0, sphere);

    for method in [
        SurrogateMethod::Value,
        SurrogateMethod::FirstOrder,
        SurrogateMethod::SecondOrder,
        SurrogateMethod::Anchor,
    ] {
        let config = small_config(method);
        let mut surrogate = model(&config, 2, 1);
        let mut rng = StdRng::seed_from_u64(2);

        let report = surrogate.fit_surrogate(&view, 3, &mut rng).unwrap();

        assert_eq!(report.value_loss.is_some(), method.uses_value_net(), "{}", method);
        assert_eq!(report.derivative_loss.is_some(), method.uses_derivative_net(), "{}", method);
        for loss in [report.value_loss, report.derivative_loss].into_iter().flatten() {
            assert!(loss.is_finite() && loss >= 0.0, "{} loss {}", method, loss);
        }

        let grad = surrogate.gradient_at(&[0.1, -0.2]).unwrap();
        assert_eq!(grad.len(), 2);
        assert!(grad.iter().all(|g| g.is_finite()));
    }
}

#[test]
fn test_second_order_at_anchor_and_huber_sum() {
    let view = view_of(3, 32, 8, 5, sphere);
    let config = small_config(SurrogateMethod::SecondOrder)
        .with_second_order_midpoint(false)
        .with_importance_sampling(false)
        .with_loss(LossKind::Huber { delta: 0.5 }, LossReduction::Sum);
    let mut surrogate = model(&config, 3, 6);

    let report = surrogate.fit_surrogate(&view, 2, &mut StdRng::seed_from_u64(7)).unwrap();
    assert!(report.derivative_loss.unwrap().is_finite());
}

#[test]
fn test_value_at_only_for_value_networks() {
    let value = model(&small_config(SurrogateMethod::Value), 2, 0);
    let anchor = model(&small_config(SurrogateMethod::Anchor), 2, 0);
    let first = model(&small_config(SurrogateMethod::FirstOrder), 2, 0);

    assert!(value.value_at(&[0.0, 0.0]).unwrap().is_some());
    assert!(anchor.value_at(&[0.0, 0.0]).unwrap().is_some());
    assert!(first.value_at(&[0.0, 0.0]).unwrap().is_none());
}

// =============================================================================
// 2. Minibatch formation
// =============================================================================

#[test]
fn test_fit_fails_when_no_minibatch_fits() {
    let view = view_of(2, 8, 8, 0, sphere);
    let config = small_config(SurrogateMethod::FirstOrder);
    let mut surrogate = model(&config, 2, 0);

    let err = surrogate
        .fit_surrogate(&view, 1, &mut StdRng::seed_from_u64(0))
        .unwrap_err();

    assert!(matches!(err, BboError::EmptyMinibatch { replay_len: 8, batch: 16 }));
    assert!(err.to_string().contains("cannot form any minibatch"));
}

#[test]
fn test_zero_epochs_is_a_no_op() {
    let view = view_of(2, 32, 8, 0, sphere);
    let mut surrogate = model(&small_config(SurrogateMethod::Value), 2, 3);
    let before = surrogate.value_at(&[0.3, 0.3]).unwrap();

    let report = surrogate.fit_surrogate(&view, 0, &mut StdRng::seed_from_u64(0)).unwrap();

    assert_eq!(report.value_loss, Some(0.0));
    assert_eq!(surrogate.value_at(&[0.3, 0.3]).unwrap(), before);
}

// =============================================================================
// 3. Input gradients
// =============================================================================

#[test]
fn test_input_gradient_matches_finite_differences() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(11);
    let net: ValueNet<TestBackend> = SurrogateNetConfig::new(3, 8, 2).init_value(&mut rng, &device);

    let x0 = [0.2f32, -0.4, 0.7];
    let eval = |x: &[f32]| -> f32 {
        let t = Tensor::<TestBackend, 1>::from_floats(x, &device).reshape([1, 3]);
        net.forward(t).into_data().to_vec::<f32>().unwrap()[0]
    };

    let points = Tensor::<TestBackend, 1>::from_floats(x0, &device).reshape([1, 3]);
    let ones = Tensor::<TestBackend, 2>::ones([1, 1], &device);
    let (out, grad) = net.forward_with_input_grad(points, ones);
    let grad = grad.into_data().to_vec::<f32>().unwrap();

    assert!((out.into_data().to_vec::<f32>().unwrap()[0] - eval(&x0)).abs() < 1e-6);

    let h = 1e-2f32;
    for k in 0..3 {
        let mut plus = x0;
        let mut minus = x0;
        plus[k] += h;
        minus[k] -= h;
        let numeric = (eval(&plus) - eval(&minus)) / (2.0 * h);
        assert!(
            (numeric - grad[k]).abs() < 1e-2,
            "d/dx{}: numeric {} vs autodiff {}",
            k,
            numeric,
            grad[k]
        );
    }
}

#[test]
fn test_cotangent_contracts_derivative_output() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(4);
    let net: DerivativeNet<TestBackend> = SurrogateNetConfig::new(2, 8, 1).init_derivative(&mut rng, &device);

    let points = Tensor::<TestBackend, 1>::from_floats([0.1, 0.5, -0.3, 0.2], &device).reshape([2, 2]);
    let zeros = Tensor::<TestBackend, 2>::zeros([2, 2], &device);
    let (out, grad) = net.forward_with_input_grad(points, zeros);

    assert_eq!(out.dims(), [2, 2]);
    let grad = grad.into_data().to_vec::<f32>().unwrap();
    assert!(grad.iter().all(|g| g.abs() < 1e-7));
}

// =============================================================================
// 4. Linear objective
// =============================================================================

#[test]
fn test_first_order_recovers_linear_gradient() {
    let c = [1.0f32, -2.0];
    let view = view_of(2, 64, 8, 21, |p| c[0] * p[0] + c[1] * p[1]);
    let config = small_config(SurrogateMethod::FirstOrder);
    let mut surrogate = model(&config, 2, 22);
    let mut rng = StdRng::seed_from_u64(23);

    surrogate.fit_surrogate(&view, 200, &mut rng).unwrap();

    let grad = surrogate.gradient_at(&[0.0, 0.0]).unwrap();
    assert!(cosine(&grad, &c) > 0.9, "learned gradient {:?}", grad);
}

#[test]
fn test_anchor_derivative_follows_value_gradient() {
    let c = [0.5f32, -1.5, 1.0];
    let view = view_of(3, 64, 8, 41, |p| c[0] * p[0] + c[1] * p[1] + c[2] * p[2]);
    let config = small_config(SurrogateMethod::Anchor).with_anchor_perturbation(0.1);
    let mut surrogate = model(&config, 3, 42);
    let mut rng = StdRng::seed_from_u64(43);

    surrogate.fit_surrogate(&view, 200, &mut rng).unwrap();

    let x = [0.1f32, -0.2, 0.3];
    let derivative = surrogate.gradient_at(&x).unwrap();
    let value_grad = match surrogate.fitter() {
        SurrogateFitter::Anchor { value, .. } => {
            let device = Default::default();
            let points = Tensor::<TestBackend, 1>::from_floats(x, &device).reshape([1, 3]);
            let ones = Tensor::<TestBackend, 2>::ones([1, 1], &device);
            let (_, grad) = value.net().forward_with_input_grad(points, ones);
            grad.into_data().to_vec::<f32>().unwrap()
        }
        _ => panic!("anchor method without a value network"),
    };

    assert!(
        cosine(&derivative, &value_grad) > 0.8,
        "g {:?} vs grad V {:?}",
        derivative,
        value_grad
    );
    assert!(cosine(&value_grad, &c) > 0.8, "grad V {:?}", value_grad);
}

#[test]
fn test_value_training_reduces_loss() {
    let view = view_of(2, 64, 8, 31, |p| p[0] - 0.5 * p[1]);
    let config = small_config(SurrogateMethod::Value);
    let mut surrogate = model(&config, 2, 32);
    let mut rng = StdRng::seed_from_u64(33);

    let first = surrogate.fit_surrogate(&view, 1, &mut rng).unwrap().value_loss.unwrap();
    surrogate.fit_surrogate(&view, 150, &mut rng).unwrap();
    let last = surrogate.fit_surrogate(&view, 1, &mut rng).unwrap().value_loss.unwrap();

    assert!(last < first, "loss did not decrease: {} -> {}", first, last);
}

// =============================================================================
// 5. Persistence
// =============================================================================

#[test]
fn test_weights_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(SurrogateMethod::Anchor);
    let view = view_of(2, 32, 8, 0, sphere);

    let mut trained = model(&config, 2, 1);
    trained.fit_surrogate(&view, 5, &mut StdRng::seed_from_u64(1)).unwrap();
    trained.save_weights(dir.path(), "checkpoint_00000064").unwrap();

    let mut restored = model(&config, 2, 99);
    restored.load_weights(dir.path(), "checkpoint_00000064").unwrap();

    let point = [0.25, -0.5];
    assert_eq!(trained.gradient_at(&point).unwrap(), restored.gradient_at(&point).unwrap());
    assert_eq!(trained.value_at(&point).unwrap(), restored.value_at(&point).unwrap());
}

#[test]
fn test_reset_reinitializes_networks() {
    let mut surrogate = model(&small_config(SurrogateMethod::FirstOrder), 2, 0);
    let before = surrogate.gradient_at(&[0.1, 0.1]).unwrap();

    surrogate.reset(&mut StdRng::seed_from_u64(1234));

    assert_ne!(before, surrogate.gradient_at(&[0.1, 0.1]).unwrap());
}

// =============================================================================
// 6. Curvature correction
// =============================================================================

/// `g(x)·Δ` for a single point.
fn directional<F: Fn(&[f32]) -> Vec<f32>>(g: &F, x: &[f32], delta: &[f32]) -> f32 {
    g(x).iter().zip(delta).map(|(a, b)| a * b).sum()
}

#[test]
fn test_curvature_correction_of_linear_field() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(51);
    let net: DerivativeNet<TestBackend> = SurrogateNetConfig::new(3, 8, 0).init_derivative(&mut rng, &device);
    let g = |x: &[f32]| -> Vec<f32> {
        let t = Tensor::<TestBackend, 1>::from_floats(x, &device).reshape([1, 3]);
        net.forward(t).into_data().to_vec::<f32>().unwrap()
    };

    // g(x) = Wx + b, so the correction is 0.5·Δ·WΔ wherever it is taken.
    let delta = [0.6f32, -0.3, 0.9];
    let expected = 0.5 * (directional(&g, &delta, &delta) - directional(&g, &[0.0; 3], &delta));

    for at in [[0.2f32, 0.1, -0.5], [0.5, -0.05, -0.05]] {
        let at = Tensor::<TestBackend, 1>::from_floats(at, &device).reshape([1, 3]);
        let delta = Tensor::<TestBackend, 1>::from_floats(delta, &device).reshape([1, 3]);
        let correction = curvature_correction(&net, at, delta).into_data().to_vec::<f32>().unwrap();

        assert_eq!(correction.len(), 1);
        assert!(
            (correction[0] - expected).abs() < 1e-4,
            "correction {} vs 0.5·Δ·WΔ {}",
            correction[0],
            expected
        );
    }
}

#[test]
fn test_curvature_correction_at_midpoint_and_anchor() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(52);
    let net: DerivativeNet<TestBackend> = SurrogateNetConfig::new(3, 16, 2).init_derivative(&mut rng, &device);
    let g = |x: &[f32]| -> Vec<f32> {
        let t = Tensor::<TestBackend, 1>::from_floats(x, &device).reshape([1, 3]);
        net.forward(t).into_data().to_vec::<f32>().unwrap()
    };

    let anchors = [[0.3f32, -0.6, 0.2], [-0.4, 0.5, 0.7]];
    let deltas = [[0.8f32, 0.5, -0.9], [0.9, -0.7, -0.8]];
    let midpoints: Vec<[f32; 3]> = anchors
        .iter()
        .zip(&deltas)
        .map(|(a, d)| [a[0] + 0.5 * d[0], a[1] + 0.5 * d[1], a[2] + 0.5 * d[2]])
        .collect();

    let batch = |rows: &[[f32; 3]]| {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::<TestBackend, 1>::from_floats(flat.as_slice(), &device).reshape([rows.len(), 3])
    };
    let at_anchor = curvature_correction(&net, batch(&anchors), batch(&deltas))
        .into_data()
        .to_vec::<f32>()
        .unwrap();
    let at_midpoint = curvature_correction(&net, batch(&midpoints), batch(&deltas))
        .into_data()
        .to_vec::<f32>()
        .unwrap();

    // 0.5 · d/dt (g(x + tΔ)·Δ) at t = 0, by central differences.
    let h = 1e-2f32;
    let numeric = |x: &[f32; 3], d: &[f32; 3]| -> f32 {
        let plus: Vec<f32> = x.iter().zip(d).map(|(a, b)| a + h * b).collect();
        let minus: Vec<f32> = x.iter().zip(d).map(|(a, b)| a - h * b).collect();
        0.5 * (directional(&g, &plus, d) - directional(&g, &minus, d)) / (2.0 * h)
    };

    let mut gap = 0.0f32;
    for k in 0..2 {
        let expected_anchor = numeric(&anchors[k], &deltas[k]);
        let expected_midpoint = numeric(&midpoints[k], &deltas[k]);
        assert!(
            (at_anchor[k] - expected_anchor).abs() < 5e-3,
            "row {} at anchor: {} vs {}",
            k,
            at_anchor[k],
            expected_anchor
        );
        assert!(
            (at_midpoint[k] - expected_midpoint).abs() < 5e-3,
            "row {} at midpoint: {} vs {}",
            k,
            at_midpoint[k],
            expected_midpoint
        );
        gap = gap.max((at_midpoint[k] - at_anchor[k]).abs());
    }
    assert!(gap > 1e-3, "midpoint and anchor corrections coincide: {:?} {:?}", at_midpoint, at_anchor);
}
