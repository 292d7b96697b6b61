//! Environment abstraction layer for procgen-launch.
//!
//! This crate defines the environment interface consumed by the launcher and
//! the training backends, the observation/space types it speaks, the
//! frame-stacking transform, and a procgen-compatible environment.

pub mod env;
pub mod error;
pub mod frame_stack;
pub mod observation;
pub mod procgen;
pub mod space;

pub use env::{Environment, StepInfo, StepResult};
pub use error::{EnvError, EnvResult};
pub use frame_stack::{FrameStack, DEFAULT_STACK_DEPTH};
pub use observation::Observation;
pub use procgen::{DistributionMode, EnvConfig, Game, ProcgenEnv};
pub use space::{BoxSpace, Discrete};
