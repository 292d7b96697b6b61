use procgen_env::{EnvConfig, Environment};
use procgen_training::{BatchMode, EnvCreator, LaunchError, LaunchResult, RolloutFragment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One rollout worker: its own environment instance and behaviour RNG.
///
/// Episodes carry over between fragments in `truncate_episodes` mode.
pub(crate) struct RolloutWorker {
    index: u32,
    env: Box<dyn Environment>,
    num_actions: usize,
    rng: StdRng,
    needs_reset: bool,
    episode_return: f32,
    episode_len: u32,
}

impl RolloutWorker {
    pub(crate) fn new(index: u32, creator: &EnvCreator, config: &EnvConfig) -> LaunchResult<Self> {
        let seed = config.rand_seed.unwrap_or(0).wrapping_add(u64::from(index));
        let env = creator(&config.clone().with_seed(seed))?;
        let num_actions = env.action_space().n;
        if num_actions == 0 {
            return Err(LaunchError::Trainer("environment has an empty action space".to_string()));
        }

        Ok(Self {
            index,
            env,
            num_actions,
            rng: StdRng::seed_from_u64(seed.rotate_left(32)),
            needs_reset: true,
            episode_return: 0.0,
            episode_len: 0,
        })
    }

    /// Collect at least `steps` transitions with a uniform random policy.
    ///
    /// In `complete_episodes` mode the fragment is extended until the
    /// current episode ends.
    pub(crate) fn sample(&mut self, steps: usize, mode: BatchMode) -> LaunchResult<RolloutFragment> {
        let mut fragment = RolloutFragment::new(self.index);
        loop {
            if fragment.len() >= steps && (mode == BatchMode::TruncateEpisodes || self.needs_reset) {
                break;
            }
            if self.needs_reset {
                self.env.reset();
                self.needs_reset = false;
                self.episode_return = 0.0;
                self.episode_len = 0;
            }

            let action = self.rng.gen_range(0..self.num_actions);
            let result = self.env.step(action)?;
            fragment.actions.push(action);
            fragment.rewards.push(result.reward);
            fragment.dones.push(result.done);
            self.episode_return += result.reward;
            self.episode_len += 1;

            if result.done {
                fragment.episode_returns.push(self.episode_return);
                fragment.episode_lengths.push(self.episode_len);
                self.needs_reset = true;
            }
        }
        Ok(fragment)
    }
}
