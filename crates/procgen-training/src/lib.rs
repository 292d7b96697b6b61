//! Procgen Training
//!
//! Backend-agnostic launch primitives for:
//! - Assembling resource and run configuration (`ResourceConfig`, `RunConfig`)
//! - Building experiment definitions (`ExperimentBuilder`)
//! - Registering environments, algorithms, preprocessors and models (`Registries`)
//! - Resolving component bundles from prioritized sources (`ResolutionChain`)
//! - Implementing training backends (`Trainer`)

pub mod algorithm;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod experiment;
pub mod job;
pub mod launcher;
pub mod layout;
pub mod model;
pub mod preprocessor;
pub mod progress;
pub mod registry;
pub mod resolve;
pub mod trainer;

pub use algorithm::{Algorithm, AlgorithmFactory, LearnerStats, RolloutBatch, RolloutFragment};
pub use artifacts::{
    ArtifactKind, CheckpointRecord, IterationResult, TrainingArtifact, TrainingManifest, TrainingMetrics,
};
pub use config::{
    flatten_params, merge_params, AlgorithmConfig, BatchMode, ConvFilter, ModelConfig, ResourceConfig,
    RunConfig, RunProgress, StopCriteria,
};
pub use error::{LaunchError, LaunchResult, RegistryKind};
pub use experiment::{ClusterResources, ExperimentBuilder, ExperimentDefinition, LogLevel, TrialConfig, TrialSpec};
pub use job::{ExperimentJob, TrainingJobId};
pub use launcher::{train_main, LaunchPlan, Launcher, BASE_ENV_NAME};
pub use layout::TrainingLayout;
pub use model::{ModelBuilder, PolicyModel};
pub use preprocessor::{Preprocessor, PreprocessorFactory};
pub use progress::{ProgressEvent, ProgressSink, StdoutProgressSink};
pub use registry::{load_algorithms, load_preprocessors, procgen_env_creator, EnvCreator, Registries};
pub use resolve::{ComponentBundle, ComponentSource, ResolutionChain, SourceError};
pub use trainer::{Trainer, TrainerStatus};
