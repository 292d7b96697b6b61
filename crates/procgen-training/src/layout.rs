use crate::error::LaunchResult;
use crate::job::TrainingJobId;
use std::path::{Path, PathBuf};

/// Filesystem layout for training artifacts.
///
/// Each job writes under `<root>/<job_id>/`: `experiment.json`,
/// `result.jsonl`, `checkpoints/` and `training_manifest.json`.
#[derive(Debug, Clone)]
pub struct TrainingLayout {
    root: PathBuf,
}

impl TrainingLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn job_dir(&self, job_id: &TrainingJobId) -> PathBuf {
        self.root.join(job_id.0.as_str())
    }

    #[must_use]
    pub fn job_manifest_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("training_manifest.json")
    }

    #[must_use]
    pub fn experiment_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("experiment.json")
    }

    /// One JSON line per training iteration.
    #[must_use]
    pub fn result_log_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("result.jsonl")
    }

    #[must_use]
    pub fn checkpoints_dir(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("checkpoints")
    }

    #[must_use]
    pub fn checkpoint_path(&self, job_id: &TrainingJobId, iteration: u64) -> PathBuf {
        self.checkpoints_dir(job_id).join(format!("checkpoint_{iteration:06}.json"))
    }

    pub fn ensure_job_dirs(&self, job_id: &TrainingJobId) -> LaunchResult<()> {
        std::fs::create_dir_all(self.job_dir(job_id))?;
        std::fs::create_dir_all(self.checkpoints_dir(job_id))?;
        Ok(())
    }
}
