//! Algorithms runnable by name.
//!
//! Both algorithms summarize the batch they are handed; neither performs a
//! policy gradient step.

use procgen_training::{Algorithm, AlgorithmConfig, LaunchError, LaunchResult, LearnerStats, RolloutBatch};
use tracing::debug;

pub const PPO_NAME: &str = "PPO";
pub const RANDOM_AGENT_NAME: &str = "custom/CustomRandomAgent";

/// Generalized advantage estimation over one fragment with a constant value
/// estimate `value`.
///
/// Returns `(advantages, value_targets)`. A fragment that does not end on a
/// terminal step bootstraps from `value`.
pub fn compute_gae(rewards: &[f32], dones: &[bool], value: f32, gamma: f32, lambda: f32) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len().min(dones.len());
    let mut advantages = vec![0.0f32; n];
    let mut targets = vec![0.0f32; n];

    let mut gae = 0.0f32;
    for t in (0..n).rev() {
        let not_done = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * value * not_done - value;
        gae = delta + gamma * lambda * not_done * gae;
        advantages[t] = gae;
        targets[t] = gae + value;
    }

    (advantages, targets)
}

fn mean_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    let var = values.iter().map(|v| (f64::from(*v) - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn episode_stats(batch: &RolloutBatch, stats: &mut LearnerStats) {
    let returns: Vec<f32> = batch.episode_returns().collect();
    stats.insert("timesteps".to_string(), batch.timesteps() as f64);
    stats.insert("episodes".to_string(), returns.len() as f64);
    if !returns.is_empty() {
        stats.insert("episode_reward_mean".to_string(), mean_std(&returns).0);
    }
}

/// Proximal policy optimization statistics with a scalar value baseline.
#[derive(Debug, Clone)]
pub struct Ppo {
    gamma: f32,
    lambda: f32,
    lr: f64,
    kl_coeff: f64,
    num_sgd_iter: u32,
    baseline: f32,
}

impl Ppo {
    pub fn new(config: &AlgorithmConfig) -> LaunchResult<Self> {
        config.validate()?;
        Ok(Self {
            gamma: config.gamma as f32,
            lambda: config.lambda as f32,
            lr: config.lr,
            kl_coeff: config.kl_coeff,
            num_sgd_iter: config.num_sgd_iter,
            baseline: 0.0,
        })
    }

    /// Current value estimate used for every state.
    #[must_use]
    pub fn baseline(&self) -> f32 {
        self.baseline
    }
}

impl Algorithm for Ppo {
    fn name(&self) -> &str {
        PPO_NAME
    }

    fn learn_on_batch(&mut self, batch: &RolloutBatch) -> LaunchResult<LearnerStats> {
        if batch.timesteps() == 0 {
            return Err(LaunchError::Trainer("PPO received an empty batch".to_string()));
        }

        let mut advantages = Vec::with_capacity(batch.timesteps());
        let mut targets = Vec::with_capacity(batch.timesteps());
        for fragment in &batch.fragments {
            let (a, t) = compute_gae(&fragment.rewards, &fragment.dones, self.baseline, self.gamma, self.lambda);
            advantages.extend(a);
            targets.extend(t);
        }

        let (adv_mean, adv_std) = mean_std(&advantages);
        let (target_mean, _) = mean_std(&targets);

        let mut stats = LearnerStats::new();
        stats.insert("advantage_mean".to_string(), adv_mean);
        stats.insert("advantage_std".to_string(), adv_std);
        stats.insert("value_target_mean".to_string(), target_mean);
        stats.insert("vf_baseline".to_string(), f64::from(self.baseline));
        stats.insert("cur_lr".to_string(), self.lr);
        stats.insert("kl_coeff".to_string(), self.kl_coeff);
        stats.insert("num_sgd_iter".to_string(), f64::from(self.num_sgd_iter));
        episode_stats(batch, &mut stats);

        self.baseline = target_mean as f32;
        debug!(advantage_mean = adv_mean, baseline = self.baseline, "PPO batch summarized");
        Ok(stats)
    }
}

/// Reports episode statistics only; the behaviour policy is already uniform.
#[derive(Debug, Clone, Default)]
pub struct CustomRandomAgent;

impl CustomRandomAgent {
    pub fn new(config: &AlgorithmConfig) -> LaunchResult<Self> {
        config.validate()?;
        Ok(Self)
    }
}

impl Algorithm for CustomRandomAgent {
    fn name(&self) -> &str {
        RANDOM_AGENT_NAME
    }

    fn learn_on_batch(&mut self, batch: &RolloutBatch) -> LaunchResult<LearnerStats> {
        let mut stats = LearnerStats::new();
        episode_stats(batch, &mut stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen_training::RolloutFragment;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_gae_monte_carlo_when_lambda_one() {
        let (adv, targets) = compute_gae(&[1.0, 1.0, 1.0], &[false, false, true], 0.0, 1.0, 1.0);
        assert_close(&adv, &[3.0, 2.0, 1.0]);
        assert_close(&targets, &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_gae_discounts_and_bootstraps() {
        let (adv, _) = compute_gae(&[1.0, 1.0], &[false, false], 0.0, 0.5, 1.0);
        assert_close(&adv, &[1.5, 1.0]);

        // Truncated fragment bootstraps from the value estimate.
        let (adv, _) = compute_gae(&[0.0], &[false], 2.0, 0.5, 1.0);
        assert_close(&adv, &[-1.0]);
    }

    #[test]
    fn test_gae_stops_at_episode_boundary() {
        let (adv, _) = compute_gae(&[1.0, 1.0], &[true, false], 0.0, 1.0, 1.0);
        assert_close(&adv, &[1.0, 1.0]);
    }

    fn batch() -> RolloutBatch {
        RolloutBatch {
            fragments: vec![RolloutFragment {
                actions: vec![0, 1, 2],
                rewards: vec![0.0, 0.0, 10.0],
                dones: vec![false, false, true],
                episode_returns: vec![10.0],
                episode_lengths: vec![3],
                ..RolloutFragment::new(0)
            }],
        }
    }

    #[test]
    fn test_ppo_reports_stats_and_moves_baseline() {
        let config = AlgorithmConfig { gamma: 1.0, lambda: 1.0, ..AlgorithmConfig::default() };
        let mut ppo = Ppo::new(&config).unwrap();
        let stats = ppo.learn_on_batch(&batch()).unwrap();

        assert!((stats["advantage_mean"] - 10.0).abs() < 1e-9);
        assert!((stats["episode_reward_mean"] - 10.0).abs() < 1e-9);
        assert!((stats["timesteps"] - 3.0).abs() < f64::EPSILON);
        assert!((ppo.baseline() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_ppo_rejects_empty_batch_and_bad_config() {
        let mut ppo = Ppo::new(&AlgorithmConfig::default()).unwrap();
        assert!(ppo.learn_on_batch(&RolloutBatch::default()).is_err());

        let bad = AlgorithmConfig { lambda: 2.0, ..AlgorithmConfig::default() };
        assert!(Ppo::new(&bad).is_err());
    }

    #[test]
    fn test_random_agent_reports_episodes() {
        let mut agent = CustomRandomAgent::new(&AlgorithmConfig::default()).unwrap();
        let stats = agent.learn_on_batch(&batch()).unwrap();
        assert!((stats["episodes"] - 1.0).abs() < f64::EPSILON);
        assert!(!stats.contains_key("advantage_mean"));
        assert_eq!(agent.name(), RANDOM_AGENT_NAME);
    }
}
