use procgen_env::Observation;
use procgen_training::Preprocessor;

pub const PREPROCESSOR_NAME: &str = "MyPreprocessor";

/// Scales 8-bit pixel intensities into `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MyPreprocessor;

impl Preprocessor for MyPreprocessor {
    fn name(&self) -> &str {
        PREPROCESSOR_NAME
    }

    fn transform(&self, observation: &Observation) -> Observation {
        observation.map(|v| (v / 255.0).clamp(0.0, 1.0))
    }
}
