//! Component sources for the resolution chain.
//!
//! The custom bundle is compiled in with the `custom-components` feature and
//! takes priority; the default bundle is always present. Only the custom
//! bundle ships its own environment wrapper; the default one leaves the
//! launcher on the stock procgen environment.

use super::algorithms::{CustomRandomAgent, RANDOM_AGENT_NAME};
use super::models::{MyVisionNetwork, VISION_NETWORK_CLASS};
use super::preprocessors::{MyPreprocessor, PREPROCESSOR_NAME};
use procgen_training::{
    Algorithm, AlgorithmConfig, ComponentBundle, ComponentSource, LaunchResult, ModelConfig, PolicyModel, Preprocessor,
    ResolutionChain, SourceError,
};
#[cfg(feature = "custom-components")]
use procgen_training::procgen_env_creator;
use std::sync::Arc;

pub const CUSTOM_SOURCE: &str = "custom";
pub const DEFAULT_SOURCE: &str = "default";

fn bundle(source: &str) -> ComponentBundle {
    ComponentBundle::new(source)
        .with_algorithm(
            RANDOM_AGENT_NAME,
            Arc::new(|config: &AlgorithmConfig| -> LaunchResult<Box<dyn Algorithm>> {
                Ok(Box::new(CustomRandomAgent::new(config)?))
            }),
        )
        .with_preprocessor(PREPROCESSOR_NAME, Arc::new(|| Box::new(MyPreprocessor) as Box<dyn Preprocessor>))
        .with_model(
            VISION_NETWORK_CLASS,
            Arc::new(|obs_shape: &[usize], num_outputs: usize, config: &ModelConfig| -> LaunchResult<Box<dyn PolicyModel>> {
                Ok(Box::new(MyVisionNetwork::build(obs_shape, num_outputs, config)?))
            }),
        )
}

/// User-supplied components, present only in `custom-components` builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomComponents;

impl ComponentSource for CustomComponents {
    fn name(&self) -> &str {
        CUSTOM_SOURCE
    }

    #[cfg(feature = "custom-components")]
    fn load(&self) -> Result<ComponentBundle, SourceError> {
        Ok(bundle(CUSTOM_SOURCE).with_env_wrapper(procgen_env_creator()))
    }

    #[cfg(not(feature = "custom-components"))]
    fn load(&self) -> Result<ComponentBundle, SourceError> {
        Err(SourceError::Unavailable("built without the custom-components feature".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComponents;

impl ComponentSource for DefaultComponents {
    fn name(&self) -> &str {
        DEFAULT_SOURCE
    }

    fn load(&self) -> Result<ComponentBundle, SourceError> {
        Ok(bundle(DEFAULT_SOURCE))
    }
}

/// Custom components first, then the default bundle.
#[must_use]
pub fn component_chain() -> ResolutionChain {
    ResolutionChain::new().with_source(CustomComponents).with_source(DefaultComponents)
}
