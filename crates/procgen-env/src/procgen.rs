//! Procgen-compatible environment.
//!
//! [`ProcgenEnv`] exposes the procgen benchmark interface (64x64 RGB frames,
//! 15 discrete actions, level and distribution-mode selection) over a compact
//! side-scrolling level generator: each level is a corridor whose length and
//! palette derive from the level seed, and the episode ends when the agent
//! reaches the goal or the step limit.

use crate::env::{Environment, StepInfo, StepResult};
use crate::error::{EnvError, EnvResult};
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const FRAME_SIZE: usize = 64;
pub const FRAME_CHANNELS: usize = 3;
pub const NUM_ACTIONS: usize = 15;
/// Procgen cuts every episode off after this many steps.
pub const MAX_EPISODE_STEPS: u32 = 1000;
pub const GOAL_REWARD: f32 = 10.0;

const AGENT_SIZE: usize = 4;
const GROUND_ROW: usize = 44;
const CELL_PIXELS: usize = 8;

/// The sixteen procgen games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    Bigfish,
    Bossfight,
    Caveflyer,
    Chaser,
    Climber,
    Coinrun,
    Dodgeball,
    Fruitbot,
    Heist,
    Jumper,
    Leaper,
    Maze,
    Miner,
    Ninja,
    Plunder,
    Starpilot,
}

impl Game {
    pub const ALL: [Self; 16] = [
        Self::Bigfish,
        Self::Bossfight,
        Self::Caveflyer,
        Self::Chaser,
        Self::Climber,
        Self::Coinrun,
        Self::Dodgeball,
        Self::Fruitbot,
        Self::Heist,
        Self::Jumper,
        Self::Leaper,
        Self::Maze,
        Self::Miner,
        Self::Ninja,
        Self::Plunder,
        Self::Starpilot,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bigfish => "bigfish",
            Self::Bossfight => "bossfight",
            Self::Caveflyer => "caveflyer",
            Self::Chaser => "chaser",
            Self::Climber => "climber",
            Self::Coinrun => "coinrun",
            Self::Dodgeball => "dodgeball",
            Self::Fruitbot => "fruitbot",
            Self::Heist => "heist",
            Self::Jumper => "jumper",
            Self::Leaper => "leaper",
            Self::Maze => "maze",
            Self::Miner => "miner",
            Self::Ninja => "ninja",
            Self::Plunder => "plunder",
            Self::Starpilot => "starpilot",
        }
    }

    /// Whether the game ships levels for `mode`.
    #[must_use]
    pub const fn supports(self, mode: DistributionMode) -> bool {
        match mode {
            DistributionMode::Easy | DistributionMode::Hard | DistributionMode::Extreme => true,
            DistributionMode::Memory => matches!(
                self,
                Self::Caveflyer | Self::Dodgeball | Self::Heist | Self::Jumper | Self::Maze | Self::Miner
            ),
            DistributionMode::Exploration => matches!(
                self,
                Self::Caveflyer
                    | Self::Climber
                    | Self::Coinrun
                    | Self::Heist
                    | Self::Jumper
                    | Self::Leaper
                    | Self::Maze
                    | Self::Ninja
            ),
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|g| *g == self).unwrap_or(0)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Game {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s.to_lowercase())
            .ok_or_else(|| EnvError::InvalidConfig(format!("unknown procgen game: {s}")))
    }
}

/// Level distribution; controls level length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    Easy,
    Hard,
    Extreme,
    Memory,
    Exploration,
}

impl DistributionMode {
    /// Level length range in cells, `[min, max)`.
    const fn level_cells(self) -> (u64, u64) {
        match self {
            Self::Easy => (16, 32),
            Self::Hard => (32, 64),
            Self::Extreme | Self::Memory | Self::Exploration => (48, 96),
        }
    }
}

/// Environment-specific configuration, nested as `config.env_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub env_name: String,
    /// Number of unique levels; `0` means unbounded.
    pub num_levels: u32,
    pub start_level: u32,
    pub paint_vel_info: bool,
    pub use_generated_assets: bool,
    pub center_agent: bool,
    pub use_sequential_levels: bool,
    pub distribution_mode: DistributionMode,
    /// Seed for level sampling; assigned per rollout worker when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rand_seed: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            env_name: Game::Coinrun.as_str().to_string(),
            num_levels: 0,
            start_level: 0,
            paint_vel_info: false,
            use_generated_assets: false,
            center_agent: true,
            use_sequential_levels: false,
            distribution_mode: DistributionMode::Easy,
            rand_seed: None,
        }
    }
}

impl EnvConfig {
    pub fn game(&self) -> EnvResult<Game> {
        self.env_name.parse()
    }

    pub fn validate(&self) -> EnvResult<Game> {
        let game = self.game()?;
        if !game.supports(self.distribution_mode) {
            return Err(EnvError::InvalidConfig(format!(
                "{game} does not support distribution_mode {:?}",
                self.distribution_mode
            )));
        }
        Ok(game)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rand_seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone)]
struct Level {
    seed: u64,
    length: usize,
    palette: [f32; 3],
}

#[derive(Debug, Clone)]
struct Episode {
    level: Level,
    position: usize,
    velocity: i64,
    steps: u32,
    done: bool,
}

/// Procgen-style environment built from an [`EnvConfig`].
#[derive(Debug)]
pub struct ProcgenEnv {
    config: EnvConfig,
    game: Game,
    rng: StdRng,
    episodes_started: u64,
    episode: Option<Episode>,
}

impl ProcgenEnv {
    pub fn new(config: EnvConfig) -> EnvResult<Self> {
        let game = config.validate()?;
        let rng = StdRng::seed_from_u64(config.rand_seed.unwrap_or(0));
        debug!(
            game = %game,
            num_levels = config.num_levels,
            start_level = config.start_level,
            mode = ?config.distribution_mode,
            "Creating procgen environment"
        );
        Ok(Self { config, game, rng, episodes_started: 0, episode: None })
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[must_use]
    pub fn game(&self) -> Game {
        self.game
    }

    fn next_level_seed(&mut self) -> u64 {
        let start = u64::from(self.config.start_level);
        let num = u64::from(self.config.num_levels);
        if self.config.use_sequential_levels {
            if num == 0 {
                start + self.episodes_started
            } else {
                start + self.episodes_started % num
            }
        } else if num == 0 {
            u64::from(self.rng.r#gen::<u32>())
        } else {
            start + self.rng.gen_range(0..num)
        }
    }

    fn build_level(&self, seed: u64) -> Level {
        // Level layout is a pure function of (game, seed, mode).
        let mut level_rng = StdRng::seed_from_u64(seed ^ ((self.game.index() as u64) << 48));
        let (min, max) = self.config.distribution_mode.level_cells();
        let length = level_rng.gen_range(min..max) as usize;
        let palette = if self.config.use_generated_assets {
            [level_rng.gen_range(0.0..255.0), level_rng.gen_range(0.0..255.0), level_rng.gen_range(0.0..255.0)]
        } else {
            let base = (self.game.index() * 16) as f32;
            [base, 255.0 - base, 96.0]
        };
        Level { seed, length, palette }
    }

    fn render(&self, episode: &Episode) -> Observation {
        let mut data = vec![0.0f32; FRAME_SIZE * FRAME_SIZE * FRAME_CHANNELS];
        let put = |data: &mut [f32], row: usize, col: usize, rgb: [f32; 3]| {
            if row < FRAME_SIZE && col < FRAME_SIZE {
                let base = (row * FRAME_SIZE + col) * FRAME_CHANNELS;
                data[base..base + FRAME_CHANNELS].copy_from_slice(&rgb);
            }
        };

        for row in 0..FRAME_SIZE {
            let rgb = if row >= GROUND_ROW + AGENT_SIZE { [64.0, 48.0, 32.0] } else { episode.level.palette };
            for col in 0..FRAME_SIZE {
                put(data.as_mut_slice(), row, col, rgb);
            }
        }

        // World x coordinate (in pixels) of the leftmost visible column.
        let agent_px = episode.position * CELL_PIXELS;
        let camera = if self.config.center_agent { agent_px.saturating_sub(FRAME_SIZE / 2) } else { 0 };
        let to_screen = |world: usize| world.checked_sub(camera).filter(|c| *c < FRAME_SIZE);

        if let Some(goal_col) = to_screen(episode.level.length * CELL_PIXELS) {
            for dr in 0..AGENT_SIZE {
                for dc in 0..AGENT_SIZE {
                    put(data.as_mut_slice(), GROUND_ROW + dr, goal_col + dc, [255.0, 215.0, 0.0]);
                }
            }
        }
        let agent_col = if self.config.center_agent {
            to_screen(agent_px)
        } else {
            Some((agent_px * (FRAME_SIZE - AGENT_SIZE)) / (episode.level.length * CELL_PIXELS).max(1))
        };
        if let Some(col) = agent_col {
            for dr in 0..AGENT_SIZE {
                for dc in 0..AGENT_SIZE {
                    put(data.as_mut_slice(), GROUND_ROW + dr, col + dc, [255.0, 255.0, 255.0]);
                }
            }
        }

        if self.config.paint_vel_info {
            let shade = match episode.velocity.signum() {
                -1 => 0.0,
                0 => 127.0,
                _ => 255.0,
            };
            for dr in 0..AGENT_SIZE {
                for dc in 0..AGENT_SIZE {
                    put(data.as_mut_slice(), dr, dc, [shade, shade, shade]);
                }
            }
        }

        Observation::new(vec![FRAME_SIZE, FRAME_SIZE, FRAME_CHANNELS], data)
            .unwrap_or_else(|_| Observation::zeros(vec![FRAME_SIZE, FRAME_SIZE, FRAME_CHANNELS]))
    }
}

impl Environment for ProcgenEnv {
    fn observation_space(&self) -> BoxSpace {
        BoxSpace::new(vec![FRAME_SIZE, FRAME_SIZE, FRAME_CHANNELS], 0.0, 255.0)
    }

    fn action_space(&self) -> Discrete {
        Discrete::new(NUM_ACTIONS)
    }

    fn reset(&mut self) -> Observation {
        let seed = self.next_level_seed();
        self.episodes_started += 1;
        let episode = Episode { level: self.build_level(seed), position: 0, velocity: 0, steps: 0, done: false };
        let obs = self.render(&episode);
        self.episode = Some(episode);
        obs
    }

    fn step(&mut self, action: usize) -> EnvResult<StepResult> {
        if action >= NUM_ACTIONS {
            return Err(EnvError::InvalidAction { action, n: NUM_ACTIONS });
        }
        let mut episode = match self.episode.take() {
            Some(ep) if !ep.done => ep,
            _ => return Err(EnvError::NotReset),
        };

        // Actions cycle left / no-op / right.
        episode.velocity = (action % 3) as i64 - 1;
        episode.position = episode
            .position
            .saturating_add_signed(episode.velocity as isize)
            .min(episode.level.length);
        episode.steps += 1;

        let level_complete = episode.position == episode.level.length;
        let timeout = !level_complete && episode.steps >= MAX_EPISODE_STEPS;
        episode.done = level_complete || timeout;
        let reward = if level_complete { GOAL_REWARD } else { 0.0 };

        let observation = self.render(&episode);
        let info = StepInfo { level_seed: episode.level.seed, level_complete, timeout };
        let done = episode.done;
        self.episode = Some(episode);

        Ok(StepResult { observation, reward, done, info })
    }
}
