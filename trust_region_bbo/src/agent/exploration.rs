//! Sampling and vector helpers for the exploration step.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// `n` Gaussian perturbations `pi + epsilon * N(0, I)`, flattened row-major.
pub fn perturb(pi: &[f32], n: usize, epsilon: f32, rng: &mut StdRng) -> Vec<f32> {
    let mut out = Vec::with_capacity(n * pi.len());
    for _ in 0..n {
        for &p in pi {
            let z: f32 = rng.sample(StandardNormal);
            out.push(p + epsilon * z);
        }
    }
    out
}

/// `n` points uniform in `[-1, 1]^dim`, flattened row-major.
pub fn uniform_box(dim: usize, n: usize, rng: &mut StdRng) -> Vec<f32> {
    (0..n * dim).map(|_| rng.gen_range(-1.0f32..=1.0)).collect()
}

/// Index of the smallest value. NaNs never win.
pub fn argmin(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

/// Rescale `v` so its L2 norm is at most `max_norm`.
pub fn clip_norm(v: &[f32], max_norm: f32) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        v.iter().map(|x| x * scale).collect()
    } else {
        v.to_vec()
    }
}

/// Replace NaN and infinite rewards by the largest finite reward of the batch.
///
/// Returns how many were replaced, or `None` when no reward is finite.
pub fn replace_non_finite(rewards: &mut [f32]) -> Option<usize> {
    let worst = rewards
        .iter()
        .copied()
        .filter(|r| r.is_finite())
        .reduce(f32::max)?;
    let mut replaced = 0;
    for r in rewards.iter_mut().filter(|r| !r.is_finite()) {
        *r = worst;
        replaced += 1;
    }
    Some(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_perturb_shape_and_center() {
        let mut rng = StdRng::seed_from_u64(0);
        let pi = [0.5f32, -0.5];

        let samples = perturb(&pi, 2000, 0.1, &mut rng);
        assert_eq!(samples.len(), 4000);

        let mean0 = samples.chunks(2).map(|p| p[0]).sum::<f32>() / 2000.0;
        assert!((mean0 - 0.5).abs() < 0.02, "mean {}", mean0);
    }

    #[test]
    fn test_zero_epsilon_repeats_pi() {
        let mut rng = StdRng::seed_from_u64(1);
        let samples = perturb(&[0.3, 0.7], 3, 0.0, &mut rng);
        assert_eq!(samples, vec![0.3, 0.7, 0.3, 0.7, 0.3, 0.7]);
    }

    #[test]
    fn test_uniform_box_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        let samples = uniform_box(3, 100, &mut rng);
        assert_eq!(samples.len(), 300);
        assert!(samples.iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn test_argmin_skips_nan() {
        assert_eq!(argmin(&[3.0, f32::NAN, 1.0, 2.0]), Some(2));
        assert_eq!(argmin(&[]), None);
    }

    #[test]
    fn test_non_finite_rewards_take_batch_maximum() {
        let mut rewards = [1.0, f32::INFINITY, -2.0, f32::NAN, 3.0, f32::NEG_INFINITY];
        assert_eq!(replace_non_finite(&mut rewards), Some(3));
        assert_eq!(rewards, [1.0, 3.0, -2.0, 3.0, 3.0, 3.0]);

        let mut finite = [0.5, 0.25];
        assert_eq!(replace_non_finite(&mut finite), Some(0));
        assert_eq!(finite, [0.5, 0.25]);

        let mut hopeless = [f32::NAN, f32::INFINITY];
        assert_eq!(replace_non_finite(&mut hopeless), None);
        assert_eq!(replace_non_finite(&mut []), None);
    }

    #[test]
    fn test_clip_norm() {
        let clipped = clip_norm(&[3.0, 4.0], 1.0);
        assert!((clipped[0] - 0.6).abs() < 1e-6 && (clipped[1] - 0.8).abs() < 1e-6);
        assert_eq!(clip_norm(&[0.3, 0.4], 1.0), vec![0.3, 0.4]);
        assert_eq!(clip_norm(&[0.0, 0.0], 1.0), vec![0.0, 0.0]);
    }
}
