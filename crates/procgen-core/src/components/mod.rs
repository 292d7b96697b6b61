//! Built-in and bundled training components.

pub mod algorithms;
pub mod models;
pub mod preprocessors;
pub mod sources;

pub use algorithms::{CustomRandomAgent, Ppo, PPO_NAME, RANDOM_AGENT_NAME};
pub use models::{MyVisionNetwork, VISION_NETWORK_CLASS};
pub use preprocessors::{MyPreprocessor, PREPROCESSOR_NAME};
pub use sources::{component_chain, CustomComponents, DefaultComponents, CUSTOM_SOURCE, DEFAULT_SOURCE};

use procgen_training::{Algorithm, AlgorithmConfig, LaunchResult, Registries};
use std::sync::Arc;

/// Registries as the framework hands them to a launcher: built-in
/// algorithms only.
pub fn framework_registries() -> LaunchResult<Registries> {
    let mut registries = Registries::new();
    registries.register_algorithm(
        PPO_NAME,
        Arc::new(|config: &AlgorithmConfig| -> LaunchResult<Box<dyn Algorithm>> { Ok(Box::new(Ppo::new(config)?)) }),
    )?;
    Ok(registries)
}
