//! Policy model interface.

use crate::config::ModelConfig;
use crate::error::LaunchResult;
use std::sync::Arc;

/// A built policy network architecture.
pub trait PolicyModel: Send + Sync {
    fn name(&self) -> &str;

    /// Size of the action-logit output.
    fn num_outputs(&self) -> usize;

    /// Number of trainable parameters.
    fn num_params(&self) -> usize;

    /// Shape of the feature map before the output head.
    fn feature_shape(&self) -> &[usize];
}

/// Builds a model for an observation shape, action count and `config.model`.
pub type ModelBuilder =
    Arc<dyn Fn(&[usize], usize, &ModelConfig) -> LaunchResult<Box<dyn PolicyModel>> + Send + Sync>;
