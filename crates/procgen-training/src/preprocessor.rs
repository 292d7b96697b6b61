//! Observation preprocessor interface.

use procgen_env::Observation;
use std::sync::Arc;

/// Transforms raw observations before they reach the model.
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &str;

    /// Shape of the transformed observation for a given input shape.
    fn output_shape(&self, input: &[usize]) -> Vec<usize> {
        input.to_vec()
    }

    fn transform(&self, observation: &Observation) -> Observation;
}

pub type PreprocessorFactory = Arc<dyn Fn() -> Box<dyn Preprocessor> + Send + Sync>;
