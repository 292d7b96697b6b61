//! Temporal frame stacking.
//!
//! Observations from a [`FrameStack`] hold the last `depth` frames of the
//! wrapped environment along a new leading axis, oldest first. On reset the
//! initial frame is repeated to fill the stack.

use crate::env::{Environment, StepResult};
use crate::error::{EnvError, EnvResult};
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};
use std::collections::VecDeque;

/// Stack depth used by the launcher's composite environment.
pub const DEFAULT_STACK_DEPTH: usize = 4;

/// Environment wrapper that stacks the most recent observation frames.
#[derive(Debug)]
pub struct FrameStack<E> {
    inner: E,
    depth: usize,
    frames: VecDeque<Observation>,
}

impl<E: Environment> FrameStack<E> {
    pub fn new(inner: E, depth: usize) -> EnvResult<Self> {
        if depth == 0 {
            return Err(EnvError::InvalidConfig("frame stack depth must be >= 1".to_string()));
        }
        Ok(Self { inner, depth, frames: VecDeque::with_capacity(depth) })
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn inner(&self) -> &E {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> E {
        self.inner
    }

    fn stacked(&self) -> EnvResult<Observation> {
        Observation::stack(&self.frames)
    }
}

impl<E: Environment> Environment for FrameStack<E> {
    fn observation_space(&self) -> BoxSpace {
        self.inner.observation_space().stacked(self.depth)
    }

    fn action_space(&self) -> Discrete {
        self.inner.action_space()
    }

    fn reset(&mut self) -> Observation {
        let first = self.inner.reset();
        self.frames.clear();
        for _ in 1..self.depth {
            self.frames.push_back(first.clone());
        }
        self.frames.push_back(first);
        // All frames are copies of `first`, so stacking cannot fail here.
        self.stacked().unwrap_or_else(|_| Observation::zeros(self.observation_space().shape))
    }

    fn step(&mut self, action: usize) -> EnvResult<StepResult> {
        if self.frames.is_empty() {
            return Err(EnvError::NotReset);
        }
        let result = self.inner.step(action)?;
        if self.frames.len() == self.depth {
            self.frames.pop_front();
        }
        self.frames.push_back(result.observation);
        Ok(StepResult {
            observation: self.stacked()?,
            reward: result.reward,
            done: result.done,
            info: result.info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StepInfo;

    /// Emits a one-element frame holding the step counter.
    struct Counter {
        t: f32,
        limit: f32,
    }

    impl Environment for Counter {
        fn observation_space(&self) -> BoxSpace {
            BoxSpace::new(vec![1], 0.0, self.limit)
        }

        fn action_space(&self) -> Discrete {
            Discrete::new(2)
        }

        fn reset(&mut self) -> Observation {
            self.t = 0.0;
            Observation::new(vec![1], vec![self.t]).unwrap()
        }

        fn step(&mut self, action: usize) -> EnvResult<StepResult> {
            if action >= 2 {
                return Err(EnvError::InvalidAction { action, n: 2 });
            }
            self.t += 1.0;
            Ok(StepResult {
                observation: Observation::new(vec![1], vec![self.t]).unwrap(),
                reward: 1.0,
                done: self.t >= self.limit,
                info: StepInfo::default(),
            })
        }
    }

    /// Changes its frame layout after reset.
    struct Reshaping;

    impl Environment for Reshaping {
        fn observation_space(&self) -> BoxSpace {
            BoxSpace::new(vec![1], 0.0, 1.0)
        }

        fn action_space(&self) -> Discrete {
            Discrete::new(1)
        }

        fn reset(&mut self) -> Observation {
            Observation::zeros(vec![1])
        }

        fn step(&mut self, _action: usize) -> EnvResult<StepResult> {
            Ok(StepResult {
                observation: Observation::new(vec![2], vec![1.0, 1.0]).unwrap(),
                reward: 0.0,
                done: false,
                info: StepInfo::default(),
            })
        }
    }

    fn counter() -> FrameStack<Counter> {
        FrameStack::new(Counter { t: 0.0, limit: 10.0 }, DEFAULT_STACK_DEPTH).unwrap()
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(FrameStack::new(Counter { t: 0.0, limit: 1.0 }, 0).is_err());
    }

    #[test]
    fn test_observation_space_is_stacked() {
        let env = counter();
        assert_eq!(env.observation_space().shape, vec![4, 1]);
        assert_eq!(env.action_space(), Discrete::new(2));
    }

    #[test]
    fn test_reset_repeats_first_frame() {
        let mut env = counter();
        let obs = env.reset();
        assert_eq!(obs.shape(), &[4, 1]);
        assert_eq!(obs.data(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_step_keeps_last_four_frames() {
        let mut env = counter();
        env.reset();
        let mut last = None;
        for _ in 0..6 {
            last = Some(env.step(1).unwrap());
        }
        let step = last.unwrap();
        assert_eq!(step.observation.data(), &[3.0, 4.0, 5.0, 6.0]);
        assert!((step.reward - 1.0).abs() < f32::EPSILON);
        assert!(!step.done);
    }

    #[test]
    fn test_partial_history_is_padded_with_initial_frame() {
        let mut env = counter();
        env.reset();
        let step = env.step(0).unwrap();
        assert_eq!(step.observation.data(), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_reset_discards_previous_episode() {
        let mut env = counter();
        env.reset();
        env.step(0).unwrap();
        env.step(0).unwrap();
        let obs = env.reset();
        assert_eq!(obs.data(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = counter();
        assert_eq!(env.step(0).unwrap_err(), EnvError::NotReset);
    }

    #[test]
    fn test_inner_errors_propagate() {
        let mut env = counter();
        env.reset();
        assert_eq!(env.step(7).unwrap_err(), EnvError::InvalidAction { action: 7, n: 2 });
    }

    #[test]
    fn test_inconsistent_frame_shape_is_error() {
        let mut env = FrameStack::new(Reshaping, DEFAULT_STACK_DEPTH).unwrap();
        assert_eq!(env.reset().shape(), &[4, 1]);
        assert_eq!(
            env.step(0).unwrap_err(),
            EnvError::FrameShapeMismatch { expected: vec![1], actual: vec![2] }
        );
    }
}
