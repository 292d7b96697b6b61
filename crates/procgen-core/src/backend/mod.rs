//! Training backends.
//!
//! The backend-agnostic `Trainer` trait lives in `procgen-training`; this
//! module holds the concrete implementations used by the launcher binary.

pub mod local;
mod worker;

pub use local::LocalRolloutTrainer;
