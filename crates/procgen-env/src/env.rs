use crate::error::EnvResult;
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};

/// Auxiliary information reported with each step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInfo {
    /// Seed of the level the step was taken in.
    pub level_seed: u64,
    /// The agent reached the level goal on this step.
    pub level_complete: bool,
    /// The episode was cut off by the step limit.
    pub timeout: bool,
}

/// Result of a single environment transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

/// A stateful reinforcement learning environment with a discrete action space.
///
/// `reset` must be called before the first `step` and again after any step
/// that reports `done`.
pub trait Environment: Send {
    /// Space containing every observation the environment can emit.
    fn observation_space(&self) -> BoxSpace;

    /// The space of valid actions.
    fn action_space(&self) -> Discrete;

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Observation;

    /// Apply `action` and advance one step.
    fn step(&mut self, action: usize) -> EnvResult<StepResult>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn observation_space(&self) -> BoxSpace {
        E::observation_space(self)
    }

    fn action_space(&self) -> Discrete {
        E::action_space(self)
    }

    fn reset(&mut self) -> Observation {
        E::reset(self)
    }

    fn step(&mut self, action: usize) -> EnvResult<StepResult> {
        E::step(self, action)
    }
}
