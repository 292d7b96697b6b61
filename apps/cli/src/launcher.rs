//! The procgen launcher: environments, components and experiment constants.

use procgen_core::components::{component_chain, VISION_NETWORK_CLASS};
use procgen_env::{DistributionMode, EnvConfig, Environment, FrameStack, DEFAULT_STACK_DEPTH};
use procgen_training::{
    load_algorithms, load_preprocessors, AlgorithmConfig, BatchMode, ConvFilter, EnvCreator, LaunchResult,
    Launcher, ModelConfig, Registries, ResourceConfig, RunConfig, StopCriteria, BASE_ENV_NAME,
};
use serde_json::Map;

/// Must differ from the base environment name.
pub const STACKED_ENV_NAME: &str = "stacked_procgen_env";
pub const VISION_NETWORK_NAME: &str = "my_vision_network";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcgenLauncher;

impl Launcher for ProcgenLauncher {
    fn env_wrapper(&self) -> LaunchResult<EnvCreator> {
        Ok(component_chain().resolve()?.env_creator())
    }

    /// Stacks frames of whichever wrapper is registered as the base env.
    fn register_env_creator(&self, registries: &mut Registries) -> LaunchResult<()> {
        let base = registries.env_creator(BASE_ENV_NAME)?;
        registries.register_env(STACKED_ENV_NAME, move |config: &EnvConfig| {
            let env = FrameStack::new(base(config)?, DEFAULT_STACK_DEPTH)?;
            Ok(Box::new(env) as Box<dyn Environment>)
        })
    }

    fn register_algorithms_and_preprocessors(&self, registries: &mut Registries) -> LaunchResult<()> {
        let bundle = component_chain().resolve()?;
        let model = bundle.model(VISION_NETWORK_CLASS)?;

        load_algorithms(registries, bundle.algorithms)?;
        load_preprocessors(registries, bundle.preprocessors)?;
        registries.register_model(VISION_NETWORK_NAME, model)
    }

    fn resource_config(&self) -> ResourceConfig {
        ResourceConfig {
            // Sized for a 16 vCPU instance.
            ray_num_cpus: 16,
            ray_num_gpus: 0,
            eager: false,
            // Progress lines are only emitted in verbose mode.
            v: true,
        }
    }

    fn run_config(&self) -> RunConfig {
        RunConfig {
            experiment_name: "training".to_string(),
            run: "PPO".to_string(),
            env: BASE_ENV_NAME.to_string(),
            stop: StopCriteria::after_iterations(15),
            checkpoint_freq: 1,
            config: AlgorithmConfig {
                gamma: 0.999,
                kl_coeff: 0.2,
                lambda: 0.9,
                lr: 0.0005,
                num_workers: 15,
                num_gpus: 0,
                rollout_fragment_length: 140,
                train_batch_size: 2048,
                batch_mode: BatchMode::TruncateEpisodes,
                num_sgd_iter: 3,
                use_pytorch: false,
                model: ModelConfig {
                    custom_model: Some(VISION_NETWORK_NAME.to_string()),
                    custom_preprocessor: None,
                    conv_filters: vec![
                        ConvFilter::new(16, [5, 5], 4),
                        ConvFilter::new(32, [3, 3], 1),
                        ConvFilter::new(256, [3, 3], 1),
                    ],
                },
                env_config: EnvConfig {
                    env_name: "coinrun".to_string(),
                    num_levels: 0,
                    start_level: 0,
                    paint_vel_info: false,
                    use_generated_assets: false,
                    center_agent: true,
                    use_sequential_levels: false,
                    distribution_mode: DistributionMode::Easy,
                    rand_seed: None,
                },
                extra: Map::new(),
            },
            config_file: None,
        }
    }
}
