//! Bounded replay of explored (policy, reward) samples.
//!
//! Samples are stored flat: `policies` holds `len * dim` values row-major and
//! `rewards` holds `len` values. Both always describe the same number of
//! samples.

use serde::{Deserialize, Serialize};

use crate::error::{BboError, Result};

/// An ordered set of samples sharing one dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    dim: usize,
    policies: Vec<f32>,
    rewards: Vec<f32>,
}

impl SampleSet {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            policies: Vec::new(),
            rewards: Vec::new(),
        }
    }

    /// Build from flat policies and matching rewards.
    pub fn from_parts(dim: usize, policies: Vec<f32>, rewards: Vec<f32>) -> Result<Self> {
        check_batch(dim, &policies, &rewards)?;
        Ok(Self {
            dim,
            policies,
            rewards,
        })
    }

    /// Append another set. Empty sets on either side are fine.
    pub fn concat(&mut self, other: &SampleSet) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.dim != other.dim {
            return Err(BboError::DimensionMismatch {
                expected: self.dim,
                actual: other.dim,
            });
        }
        self.policies.extend_from_slice(&other.policies);
        self.rewards.extend_from_slice(&other.rewards);
        Ok(())
    }

    /// Append a flat batch.
    pub fn push_batch(&mut self, policies: &[f32], rewards: &[f32]) -> Result<()> {
        check_batch(self.dim, policies, rewards)?;
        self.policies.extend_from_slice(policies);
        self.rewards.extend_from_slice(rewards);
        Ok(())
    }

    /// Samples whose L1 distance to `center` is strictly below `radius`.
    pub fn filter_in_trust_region(&self, center: &[f32], radius: f32) -> SampleSet {
        let mut kept = SampleSet::new(self.dim);
        for (policy, &reward) in self.iter() {
            let l1: f32 = policy.iter().zip(center).map(|(p, c)| (p - c).abs()).sum();
            if l1 < radius {
                kept.policies.extend_from_slice(policy);
                kept.rewards.push(reward);
            }
        }
        kept
    }

    /// Drop all but the most recent `n` samples.
    pub fn keep_last(&mut self, n: usize) {
        let len = self.len();
        if n >= len {
            return;
        }
        let drop = len - n;
        self.rewards.drain(..drop);
        self.policies.drain(..drop * self.dim);
    }

    /// Apply `f` to every policy row, keeping rewards.
    pub fn map_policies<F>(&self, mut f: F) -> SampleSet
    where
        F: FnMut(&[f32]) -> Vec<f32>,
    {
        let policies = self.policies.chunks_exact(self.dim.max(1)).flat_map(|p| f(p)).collect();
        SampleSet {
            dim: self.dim,
            policies,
            rewards: self.rewards.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f32], &f32)> {
        self.policies.chunks_exact(self.dim.max(1)).zip(self.rewards.iter())
    }

    pub fn policy(&self, index: usize) -> &[f32] {
        &self.policies[index * self.dim..(index + 1) * self.dim]
    }

    pub fn policies(&self) -> &[f32] {
        &self.policies
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn clear(&mut self) {
        self.policies.clear();
        self.rewards.clear();
    }
}

fn check_batch(dim: usize, policies: &[f32], rewards: &[f32]) -> Result<()> {
    if policies.len() != rewards.len() * dim {
        return Err(BboError::DimensionMismatch {
            expected: rewards.len() * dim,
            actual: policies.len(),
        });
    }
    Ok(())
}

/// Training data handed to a surrogate fit: policies and normalized rewards.
#[derive(Debug, Clone)]
pub struct ReplayView {
    pub dim: usize,
    pub n_explore: usize,
    pub policies: Vec<f32>,
    pub rewards: Vec<f32>,
}

impl ReplayView {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn policy(&self, index: usize) -> &[f32] {
        &self.policies[index * self.dim..(index + 1) * self.dim]
    }
}

/// FIFO replay buffer whose length stays a multiple of the exploration batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayBuffer {
    samples: SampleSet,
    capacity: usize,
    n_explore: usize,
}

impl ReplayBuffer {
    /// # Panics
    /// Panics if `n_explore` is zero.
    pub fn new(dim: usize, capacity: usize, n_explore: usize) -> Self {
        assert!(n_explore > 0, "n_explore must be positive");
        Self {
            samples: SampleSet::new(dim),
            capacity,
            n_explore,
        }
    }

    /// Append a batch, then keep the most recent whole exploration batches
    /// that fit in the capacity.
    pub fn extend(&mut self, policies: &[f32], rewards: &[f32]) -> Result<()> {
        self.samples.push_batch(policies, rewards)?;
        self.truncate();
        Ok(())
    }

    /// Append a sample set under the same retention rule.
    pub fn extend_set(&mut self, set: &SampleSet) -> Result<()> {
        self.samples.concat(set)?;
        self.truncate();
        Ok(())
    }

    fn truncate(&mut self) {
        let len = self.samples.len();
        let keep = (len.min(self.capacity) / self.n_explore) * self.n_explore;
        if keep < len {
            log::trace!("Replay buffer evicting {} samples", len - keep);
        }
        self.samples.keep_last(keep);
    }

    /// Snapshot the buffer with rewards passed through `normalize`.
    pub fn view<F>(&self, normalize: F) -> ReplayView
    where
        F: FnOnce(&[f32]) -> Vec<f32>,
    {
        ReplayView {
            dim: self.samples.dim(),
            n_explore: self.n_explore,
            policies: self.samples.policies().to_vec(),
            rewards: normalize(self.samples.rewards()),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    pub fn rewards(&self) -> &[f32] {
        self.samples.rewards()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn n_explore(&self) -> usize {
        self.n_explore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(dim: usize, start: usize, n: usize) -> (Vec<f32>, Vec<f32>) {
        let policies = (start..start + n)
            .flat_map(|i| std::iter::repeat(i as f32).take(dim))
            .collect();
        let rewards = (start..start + n).map(|i| i as f32).collect();
        (policies, rewards)
    }

    #[test]
    fn test_extend_keeps_most_recent_whole_batches() {
        let mut buffer = ReplayBuffer::new(2, 64, 8);

        let (p, r) = batch(2, 0, 8);
        buffer.extend(&p, &r).unwrap();
        let (p, r) = batch(2, 8, 5);
        buffer.extend(&p, &r).unwrap();

        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.rewards(), &[5., 6., 7., 8., 9., 10., 11., 12.]);
        assert_eq!(buffer.samples().policy(0), &[5.0, 5.0]);
    }

    #[test]
    fn test_capacity_and_multiple_of_batch() {
        let mut buffer = ReplayBuffer::new(1, 20, 8);
        for k in 0..6 {
            let (p, r) = batch(1, k * 8, 8);
            buffer.extend(&p, &r).unwrap();
            assert_eq!(buffer.len() % 8, 0);
            assert!(buffer.len() <= 20);
            assert_eq!(buffer.samples().policies().len(), buffer.len());
        }
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.rewards()[0], 32.0);
    }

    #[test]
    fn test_extend_rejects_ragged_batch() {
        let mut buffer = ReplayBuffer::new(3, 16, 4);
        let err = buffer.extend(&[0.0; 5], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, BboError::DimensionMismatch { expected: 6, actual: 5 }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_filter_in_trust_region_is_strict_l1() {
        let set = SampleSet::from_parts(
            2,
            vec![0.0, 0.0, 0.3, 0.2, 0.5, 0.0, -0.1, 0.1],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        let kept = set.filter_in_trust_region(&[0.0, 0.0], 0.5);
        assert_eq!(kept.rewards(), &[1.0, 4.0]);
        assert_eq!(kept.policies(), &[0.0, 0.0, -0.1, 0.1]);
    }

    #[test]
    fn test_empty_sets_concatenate() {
        let mut a = SampleSet::new(2);
        let b = SampleSet::new(2);
        a.concat(&b).unwrap();
        assert!(a.is_empty());

        let c = SampleSet::from_parts(2, vec![1.0, 2.0], vec![3.0]).unwrap();
        a.concat(&c).unwrap();
        a.concat(&SampleSet::default()).unwrap();
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_view_normalizes_rewards() {
        let mut buffer = ReplayBuffer::new(1, 8, 2);
        buffer.extend(&[0.1, 0.2], &[2.0, 4.0]).unwrap();

        let view = buffer.view(|r| r.iter().map(|x| x / 2.0).collect());
        assert_eq!(view.rewards, vec![1.0, 2.0]);
        assert_eq!(view.policy(1), &[0.2]);
        assert_eq!(view.n_explore, 2);
    }

    #[test]
    fn test_extend_set_below_batch_is_dropped() {
        let mut buffer = ReplayBuffer::new(1, 32, 8);
        let survivors = SampleSet::from_parts(1, vec![0.1, 0.2, 0.3], vec![1.0, 2.0, 3.0]).unwrap();
        buffer.extend_set(&survivors).unwrap();
        assert!(buffer.is_empty());

        let (p, r) = batch(1, 0, 8);
        buffer.extend(&p, &r).unwrap();
        assert_eq!(buffer.len(), 8);
    }
}
