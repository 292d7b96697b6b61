use crate::artifacts::TrainingManifest;
use crate::error::LaunchResult;
use crate::job::{ExperimentJob, TrainingJobId};
use crate::progress::ProgressSink;
use crate::registry::Registries;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainerStatus {
    Idle,
    Preparing,
    Running,
    Finished,
    Failed(String),
    Cancelled,
}

/// A backend that executes experiment definitions.
#[async_trait]
pub trait Trainer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn prepare(&self, job: &ExperimentJob) -> LaunchResult<()>;

    /// Run until the trial's stop criteria are met.
    async fn run(
        &self,
        job: &ExperimentJob,
        registries: &Registries,
        progress: &dyn ProgressSink,
    ) -> LaunchResult<TrainingManifest>;

    async fn status(&self, job_id: &TrainingJobId) -> LaunchResult<TrainerStatus>;

    async fn cancel(&self, job_id: &TrainingJobId) -> LaunchResult<()>;
}
