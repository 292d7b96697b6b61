use thiserror::Error;

pub type EnvResult<T> = std::result::Result<T, EnvError>;

/// Errors raised while constructing or stepping an environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// The environment configuration was rejected at construction time.
    #[error("invalid environment config: {0}")]
    InvalidConfig(String),

    /// The action is outside the environment's action space.
    #[error("action {action} is outside the action space of size {n}")]
    InvalidAction { action: usize, n: usize },

    /// `step` was called before `reset`, or after the episode finished.
    #[error("environment must be reset before stepping")]
    NotReset,

    /// Observation buffer length does not match its declared shape.
    #[error("observation shape {shape:?} expects {expected} values, got {actual}")]
    ShapeMismatch { shape: Vec<usize>, expected: usize, actual: usize },

    /// Frames passed to a stack disagree on shape.
    #[error("cannot stack frame of shape {actual:?} onto frames of shape {expected:?}")]
    FrameShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
}
