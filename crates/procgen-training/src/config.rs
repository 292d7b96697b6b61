//! Experiment configuration mappings.
//!
//! A launch is described by two mappings: [`ResourceConfig`] (cluster sizing
//! and verbosity) and [`RunConfig`] (algorithm, environment, stopping and
//! checkpointing, nested hyperparameters). Their serialized key names and
//! nesting are the contract with the experiment builder, so field names here
//! must not change.

use crate::error::{LaunchError, LaunchResult};
use procgen_env::EnvConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Compute allocation and logging verbosity for a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub ray_num_cpus: u32,
    pub ray_num_gpus: u32,
    pub eager: bool,
    /// Verbose (INFO) progress logging.
    pub v: bool,
}

/// Conditions that end a training run; the first one met stops it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_iteration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_total_s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timesteps_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_reward_mean: Option<f64>,
}

/// Progress snapshot checked against [`StopCriteria`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunProgress {
    pub training_iteration: u64,
    pub time_total_s: f64,
    pub timesteps_total: u64,
    pub episode_reward_mean: Option<f64>,
}

impl StopCriteria {
    #[must_use]
    pub fn after_iterations(n: u64) -> Self {
        Self { training_iteration: Some(n), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.training_iteration.is_none()
            && self.time_total_s.is_none()
            && self.timesteps_total.is_none()
            && self.episode_reward_mean.is_none()
    }

    #[must_use]
    pub fn is_met(&self, progress: &RunProgress) -> bool {
        self.training_iteration.is_some_and(|n| progress.training_iteration >= n)
            || self.time_total_s.is_some_and(|s| progress.time_total_s >= s as f64)
            || self.timesteps_total.is_some_and(|t| progress.timesteps_total >= t)
            || matches!(
                (self.episode_reward_mean, progress.episode_reward_mean),
                (Some(target), Some(mean)) if mean >= target
            )
    }
}

/// How rollout workers cut experience into fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Fixed-length fragments; episodes may span fragments.
    #[default]
    TruncateEpisodes,
    /// Fragments are extended until every episode in them is finished.
    CompleteEpisodes,
}

/// One convolution layer: `[out_channels, [kernel_h, kernel_w], stride]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvFilter(pub u32, pub [u32; 2], pub u32);

impl ConvFilter {
    #[must_use]
    pub const fn new(out_channels: u32, kernel: [u32; 2], stride: u32) -> Self {
        Self(out_channels, kernel, stride)
    }

    #[must_use]
    pub const fn out_channels(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn kernel(&self) -> [u32; 2] {
        self.1
    }

    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.2
    }
}

/// Model architecture descriptor, nested as `config.model`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_preprocessor: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conv_filters: Vec<ConvFilter>,
}

/// Per-algorithm hyperparameters, nested as `config`.
///
/// Keys missing from a deserialized mapping take the framework defaults.
/// Keys this crate does not interpret are kept in `extra` and serialized
/// back alongside the known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub gamma: f64,
    pub kl_coeff: f64,
    pub lambda: f64,
    pub lr: f64,
    pub num_workers: u32,
    pub num_gpus: u32,
    pub rollout_fragment_length: u32,
    pub train_batch_size: u32,
    pub batch_mode: BatchMode,
    pub num_sgd_iter: u32,
    pub use_pytorch: bool,
    pub model: ModelConfig,
    pub env_config: EnvConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            kl_coeff: 0.2,
            lambda: 1.0,
            lr: 5e-5,
            num_workers: 2,
            num_gpus: 0,
            rollout_fragment_length: 200,
            train_batch_size: 4000,
            batch_mode: BatchMode::TruncateEpisodes,
            num_sgd_iter: 30,
            use_pytorch: false,
            model: ModelConfig::default(),
            env_config: EnvConfig::default(),
            extra: Map::new(),
        }
    }
}

impl AlgorithmConfig {
    pub fn validate(&self) -> LaunchResult<()> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(LaunchError::InvalidConfig("gamma must be within [0, 1]".to_string()));
        }
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(LaunchError::InvalidConfig("lambda must be within [0, 1]".to_string()));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(LaunchError::InvalidConfig("lr must be > 0".to_string()));
        }
        if self.kl_coeff < 0.0 {
            return Err(LaunchError::InvalidConfig("kl_coeff must be >= 0".to_string()));
        }
        if self.rollout_fragment_length == 0 {
            return Err(LaunchError::InvalidConfig("rollout_fragment_length must be >= 1".to_string()));
        }
        if self.train_batch_size == 0 {
            return Err(LaunchError::InvalidConfig("train_batch_size must be >= 1".to_string()));
        }
        if self.num_sgd_iter == 0 {
            return Err(LaunchError::InvalidConfig("num_sgd_iter must be >= 1".to_string()));
        }
        self.env_config.validate()?;
        Ok(())
    }
}

/// Everything describing one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub experiment_name: String,
    /// Algorithm registry name.
    pub run: String,
    /// Environment registry name.
    pub env: String,
    pub stop: StopCriteria,
    /// Checkpoint every N iterations; `0` disables periodic checkpoints.
    pub checkpoint_freq: u32,
    pub config: AlgorithmConfig,
    /// JSON file deep-merged over `config` by the experiment builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Union of both mappings at the top level; run keys win on collision.
pub fn merge_params(resources: &ResourceConfig, run: &RunConfig) -> LaunchResult<Map<String, Value>> {
    let mut params = into_object(serde_json::to_value(resources)?)?;
    params.extend(into_object(serde_json::to_value(run)?)?);
    Ok(params)
}

fn into_object(value: Value) -> LaunchResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LaunchError::InvalidConfig(format!("expected a mapping, got {other}"))),
    }
}

/// Dotted-key view of nested mappings (`stop.training_iteration`).
///
/// Arrays are leaves.
#[must_use]
pub fn flatten_params(params: &Map<String, Value>) -> BTreeMap<String, Value> {
    fn walk(prefix: &str, map: &Map<String, Value>, out: &mut BTreeMap<String, Value>) {
        for (key, value) in map {
            let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
            match value {
                Value::Object(inner) => walk(&path, inner, out),
                leaf => {
                    out.insert(path, leaf.clone());
                }
            }
        }
    }

    let mut out = BTreeMap::new();
    walk("", params, &mut out);
    out
}

/// Recursively overlay `overlay` onto `base`; objects merge, everything else replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
