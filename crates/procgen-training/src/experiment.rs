//! Experiment definitions.
//!
//! [`ExperimentBuilder`] turns the merged resource + run mapping into an
//! [`ExperimentDefinition`]: cluster sizing on one side, a single trial spec
//! on the other. The builder interprets the mapping; the launcher only
//! assembles it.

use crate::config::{deep_merge, AlgorithmConfig, StopCriteria};
use crate::error::{LaunchError, LaunchResult, RegistryKind};
use crate::registry::Registries;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Framework log level injected into the trial config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Debug,
}

/// Resources reserved for the whole cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_gpus: Option<u32>,
}

/// The config a trial runs with: hyperparameters plus builder-injected keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    #[serde(flatten)]
    pub algorithm: AlgorithmConfig,
    pub env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub eager: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub run: String,
    pub env: String,
    pub stop: StopCriteria,
    pub checkpoint_freq: u32,
    pub checkpoint_at_end: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_checkpoints_num: Option<u32>,
    pub num_samples: u32,
    pub config: TrialConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub name: String,
    pub cluster: ClusterResources,
    pub trial: TrialSpec,
}

impl ExperimentDefinition {
    /// Every name the trial references must be registered.
    pub fn validate_against(&self, registries: &Registries) -> LaunchResult<()> {
        registries.require(RegistryKind::Env, &self.trial.env)?;
        registries.require(RegistryKind::Algorithm, &self.trial.run)?;
        let model = &self.trial.config.algorithm.model;
        if let Some(name) = &model.custom_model {
            registries.require(RegistryKind::Model, name)?;
        }
        if let Some(name) = &model.custom_preprocessor {
            registries.require(RegistryKind::Preprocessor, name)?;
        }
        Ok(())
    }
}

fn default_experiment_name() -> String {
    "default".to_string()
}

fn default_num_samples() -> u32 {
    1
}

/// Trial config keys the builder sets itself.
const INJECTED_KEYS: [&str; 3] = ["env", "log_level", "eager"];

/// Recognized keys of the merged parameter mapping.
#[derive(Debug, Clone, Deserialize)]
struct ExperimentParams {
    #[serde(default = "default_experiment_name")]
    experiment_name: String,
    run: String,
    env: Option<String>,
    #[serde(default)]
    stop: StopCriteria,
    #[serde(default)]
    checkpoint_freq: u32,
    #[serde(default)]
    checkpoint_at_end: bool,
    #[serde(default)]
    keep_checkpoints_num: Option<u32>,
    #[serde(default = "default_num_samples")]
    num_samples: u32,
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default)]
    config_file: Option<PathBuf>,
    #[serde(default)]
    ray_num_cpus: Option<u32>,
    #[serde(default)]
    ray_num_gpus: Option<u32>,
    #[serde(default)]
    eager: bool,
    #[serde(default)]
    v: bool,
    #[serde(default)]
    vv: bool,
}

/// Builds an [`ExperimentDefinition`] from a merged parameter mapping.
#[derive(Debug, Clone)]
pub struct ExperimentBuilder {
    params: ExperimentParams,
}

impl ExperimentBuilder {
    pub fn new(params: Map<String, Value>) -> LaunchResult<Self> {
        let params: ExperimentParams = serde_json::from_value(Value::Object(params))
            .map_err(|e| LaunchError::InvalidConfig(e.to_string()))?;
        Ok(Self { params })
    }

    fn algorithm_config(&self) -> LaunchResult<AlgorithmConfig> {
        let mut config = Value::Object(self.params.config.clone());
        if let Some(path) = &self.params.config_file {
            let bytes = std::fs::read(path).map_err(|e| {
                LaunchError::InvalidConfig(format!("failed to read config_file {}: {e}", path.display()))
            })?;
            let overlay: Value = serde_json::from_slice(&bytes)?;
            if !overlay.is_object() {
                return Err(LaunchError::InvalidConfig(format!(
                    "config_file {} must contain a JSON object",
                    path.display()
                )));
            }
            deep_merge(&mut config, overlay);
        }
        let mut algorithm: AlgorithmConfig =
            serde_json::from_value(config).map_err(|e| LaunchError::InvalidConfig(format!("config: {e}")))?;

        for key in INJECTED_KEYS {
            if algorithm.extra.remove(key).is_some() {
                warn!(key, "config key is set by the experiment builder; ignoring supplied value");
            }
        }
        if !algorithm.extra.is_empty() {
            debug!(keys = ?algorithm.extra.keys().collect::<Vec<_>>(), "Passing through uninterpreted config keys");
        }
        Ok(algorithm)
    }

    pub fn experiment_definition(&self) -> LaunchResult<ExperimentDefinition> {
        let p = &self.params;
        let env = p
            .env
            .clone()
            .ok_or_else(|| LaunchError::InvalidConfig("env is required".to_string()))?;
        if p.stop.is_empty() {
            return Err(LaunchError::InvalidConfig("at least one stop criterion is required".to_string()));
        }
        if p.num_samples == 0 {
            return Err(LaunchError::InvalidConfig("num_samples must be >= 1".to_string()));
        }

        let algorithm = self.algorithm_config()?;
        algorithm.validate()?;

        if let Some(cpus) = p.ray_num_cpus {
            // One CPU is reserved for the driver.
            if algorithm.num_workers + 1 > cpus {
                warn!(
                    num_workers = algorithm.num_workers,
                    ray_num_cpus = cpus,
                    "num_workers exceeds available CPUs"
                );
            }
        }
        if let Some(gpus) = p.ray_num_gpus {
            if algorithm.num_gpus > gpus {
                warn!(num_gpus = algorithm.num_gpus, ray_num_gpus = gpus, "num_gpus exceeds available GPUs");
            }
        }

        let log_level = if p.vv {
            Some(LogLevel::Debug)
        } else if p.v {
            Some(LogLevel::Info)
        } else {
            None
        };

        Ok(ExperimentDefinition {
            name: p.experiment_name.clone(),
            cluster: ClusterResources { num_cpus: p.ray_num_cpus, num_gpus: p.ray_num_gpus },
            trial: TrialSpec {
                run: p.run.clone(),
                env: env.clone(),
                stop: p.stop.clone(),
                checkpoint_freq: p.checkpoint_freq,
                checkpoint_at_end: p.checkpoint_at_end,
                keep_checkpoints_num: p.keep_checkpoints_num,
                num_samples: p.num_samples,
                config: TrialConfig { algorithm, env, log_level, eager: p.eager },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Shared buffer the test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn warnings_during(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .without_time()
            .with_writer(buffer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn base() -> Value {
        json!({
            "ray_num_cpus": 4,
            "ray_num_gpus": 0,
            "eager": false,
            "v": true,
            "experiment_name": "training",
            "run": "PPO",
            "env": "procgen_env_wrapper",
            "stop": {"training_iteration": 2},
            "checkpoint_freq": 1,
            "config": {"gamma": 0.999, "lambda": 0.9, "num_workers": 3}
        })
    }

    #[test]
    fn test_builder_produces_trial() {
        let def = ExperimentBuilder::new(params(base())).unwrap().experiment_definition().unwrap();
        assert_eq!(def.name, "training");
        assert_eq!(def.cluster.num_cpus, Some(4));
        assert_eq!(def.trial.run, "PPO");
        assert_eq!(def.trial.env, "procgen_env_wrapper");
        assert_eq!(def.trial.config.env, "procgen_env_wrapper");
        assert_eq!(def.trial.config.log_level, Some(LogLevel::Info));
        assert_eq!(def.trial.stop.training_iteration, Some(2));
        assert_eq!(def.trial.num_samples, 1);
        assert!(!def.trial.checkpoint_at_end);
        assert!((def.trial.config.algorithm.gamma - 0.999).abs() < f64::EPSILON);
        assert_eq!(def.trial.config.algorithm.num_workers, 3);
    }

    #[test]
    fn test_trial_config_serializes_flat() {
        let def = ExperimentBuilder::new(params(base())).unwrap().experiment_definition().unwrap();
        let value = serde_json::to_value(&def.trial.config).unwrap();
        assert_eq!(value["env"], json!("procgen_env_wrapper"));
        assert_eq!(value["log_level"], json!("INFO"));
        assert_eq!(value["lambda"], json!(0.9));
        assert!(value["env_config"].is_object());
    }

    #[test]
    fn test_vv_selects_debug() {
        let mut value = base();
        value["vv"] = json!(true);
        let def = ExperimentBuilder::new(params(value)).unwrap().experiment_definition().unwrap();
        assert_eq!(def.trial.config.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_missing_env_and_stop_rejected() {
        let mut value = base();
        value.as_object_mut().unwrap().remove("env");
        assert!(ExperimentBuilder::new(params(value)).unwrap().experiment_definition().is_err());

        let mut value = base();
        value["stop"] = json!({});
        assert!(ExperimentBuilder::new(params(value)).unwrap().experiment_definition().is_err());
    }

    #[test]
    fn test_missing_run_rejected() {
        let mut value = base();
        value.as_object_mut().unwrap().remove("run");
        assert!(matches!(ExperimentBuilder::new(params(value)), Err(LaunchError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_hyperparameters_rejected() {
        let mut value = base();
        value["config"]["gamma"] = json!(2.0);
        assert!(ExperimentBuilder::new(params(value)).unwrap().experiment_definition().is_err());
    }

    #[test]
    fn test_config_file_overlays_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"lr": 0.01, "env_config": {{"env_name": "starpilot", "num_levels": 0, "start_level": 0, "paint_vel_info": false, "use_generated_assets": false, "center_agent": true, "use_sequential_levels": false, "distribution_mode": "hard"}}}}"#).unwrap();

        let mut value = base();
        value["config_file"] = json!(file.path());
        let def = ExperimentBuilder::new(params(value)).unwrap().experiment_definition().unwrap();
        let algorithm = &def.trial.config.algorithm;
        assert!((algorithm.lr - 0.01).abs() < f64::EPSILON);
        assert!((algorithm.gamma - 0.999).abs() < f64::EPSILON);
        assert_eq!(algorithm.env_config.env_name, "starpilot");
    }

    #[test]
    fn test_unrecognized_config_keys_survive_overlay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"entropy_coeff": 0.01, "lr": 0.01}}"#).unwrap();

        let mut value = base();
        value["config"]["vf_share_layers"] = json!(true);
        value["config_file"] = json!(file.path());
        let def = ExperimentBuilder::new(params(value)).unwrap().experiment_definition().unwrap();
        let algorithm = &def.trial.config.algorithm;
        assert!((algorithm.lr - 0.01).abs() < f64::EPSILON);
        assert_eq!(algorithm.extra["entropy_coeff"], json!(0.01));
        assert_eq!(algorithm.extra["vf_share_layers"], json!(true));

        let printed = serde_json::to_value(&def).unwrap();
        assert_eq!(printed["trial"]["config"]["entropy_coeff"], json!(0.01));
        assert_eq!(printed["trial"]["config"]["vf_share_layers"], json!(true));
        let reparsed: ExperimentDefinition = serde_json::from_value(printed).unwrap();
        assert_eq!(reparsed, def);
    }

    #[test]
    fn test_builder_keys_in_config_are_not_duplicated() {
        let mut value = base();
        value["config"]["env"] = json!("something_else");
        let def = ExperimentBuilder::new(params(value)).unwrap().experiment_definition().unwrap();
        assert_eq!(def.trial.config.env, "procgen_env_wrapper");
        assert!(def.trial.config.algorithm.extra.is_empty());
    }

    #[test]
    fn test_oversubscribed_resources_warn() {
        let mut value = base();
        value["config"]["num_workers"] = json!(8);
        value["config"]["num_gpus"] = json!(1);
        let logs = warnings_during(|| {
            let def = ExperimentBuilder::new(params(value)).unwrap().experiment_definition().unwrap();
            assert_eq!(def.trial.config.algorithm.num_workers, 8);
        });
        assert!(logs.contains("num_workers exceeds available CPUs"), "{logs}");
        assert!(logs.contains("num_gpus exceeds available GPUs"), "{logs}");
    }

    #[test]
    fn test_fitting_resources_do_not_warn() {
        // 3 workers + 1 driver on 4 CPUs.
        let logs = warnings_during(|| {
            ExperimentBuilder::new(params(base())).unwrap().experiment_definition().unwrap();
        });
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_missing_config_file_rejected() {
        let mut value = base();
        value["config_file"] = json!("/nonexistent/procgen/config.json");
        assert!(ExperimentBuilder::new(params(value)).unwrap().experiment_definition().is_err());
    }

    #[test]
    fn test_validate_against_registries() {
        let def = ExperimentBuilder::new(params(base())).unwrap().experiment_definition().unwrap();
        let registries = Registries::new();
        assert!(matches!(
            def.validate_against(&registries),
            Err(LaunchError::Unregistered { kind: RegistryKind::Env, .. })
        ));
    }
}
