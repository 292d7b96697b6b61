//! Algorithm interface and rollout sample types.

use crate::config::AlgorithmConfig;
use crate::error::LaunchResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Experience collected by one rollout worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolloutFragment {
    pub worker_index: u32,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    /// `dones[t]` is true when step `t` ended an episode.
    pub dones: Vec<bool>,
    /// Returns of the episodes that finished inside this fragment.
    pub episode_returns: Vec<f32>,
    pub episode_lengths: Vec<u32>,
}

impl RolloutFragment {
    #[must_use]
    pub fn new(worker_index: u32) -> Self {
        Self { worker_index, ..Self::default() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// All fragments gathered for one training iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolloutBatch {
    pub fragments: Vec<RolloutFragment>,
}

impl RolloutBatch {
    #[must_use]
    pub fn timesteps(&self) -> usize {
        self.fragments.iter().map(RolloutFragment::len).sum()
    }

    pub fn episode_returns(&self) -> impl Iterator<Item = f32> + '_ {
        self.fragments.iter().flat_map(|f| f.episode_returns.iter().copied())
    }

    pub fn episode_lengths(&self) -> impl Iterator<Item = u32> + '_ {
        self.fragments.iter().flat_map(|f| f.episode_lengths.iter().copied())
    }
}

/// Named scalar statistics reported by an algorithm after a training step.
pub type LearnerStats = BTreeMap<String, f64>;

/// A training algorithm the framework can run by name.
pub trait Algorithm: Send + Sync {
    /// Registry name of the algorithm.
    fn name(&self) -> &str;

    /// Reject hyperparameters this algorithm cannot run with.
    fn validate(&self, config: &AlgorithmConfig) -> LaunchResult<()> {
        config.validate()
    }

    /// Consume one iteration's batch and report learner statistics.
    fn learn_on_batch(&mut self, batch: &RolloutBatch) -> LaunchResult<LearnerStats>;
}

/// Builds an algorithm instance for a run's config.
pub type AlgorithmFactory = Arc<dyn Fn(&AlgorithmConfig) -> LaunchResult<Box<dyn Algorithm>> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_aggregates_fragments() {
        let batch = RolloutBatch {
            fragments: vec![
                RolloutFragment {
                    rewards: vec![0.0, 1.0],
                    dones: vec![false, true],
                    episode_returns: vec![1.0],
                    episode_lengths: vec![2],
                    ..RolloutFragment::new(0)
                },
                RolloutFragment { rewards: vec![0.0; 3], dones: vec![false; 3], ..RolloutFragment::new(1) },
            ],
        };
        assert_eq!(batch.timesteps(), 5);
        assert_eq!(batch.episode_returns().collect::<Vec<_>>(), vec![1.0]);
        assert_eq!(batch.episode_lengths().count(), 1);
    }
}
