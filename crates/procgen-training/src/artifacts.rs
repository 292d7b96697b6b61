use crate::algorithm::LearnerStats;
use crate::error::{LaunchError, LaunchResult};
use crate::job::TrainingJobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Checkpoint,
    ExperimentConfig,
    ResultLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
}

/// Result of one training iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub training_iteration: u64,
    pub timesteps_this_iter: u64,
    pub timesteps_total: u64,
    pub episodes_this_iter: u64,
    pub episode_reward_mean: Option<f64>,
    pub episode_len_mean: Option<f64>,
    pub time_total_s: f64,
    #[serde(default)]
    pub learner: LearnerStats,
}

/// Persisted training state at an iteration boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub job_id: TrainingJobId,
    pub iteration: u64,
    pub created_at: DateTime<Utc>,
    pub result: IterationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrainingMetrics {
    pub training_iteration: u64,
    pub timesteps_total: u64,
    pub episode_reward_mean: Option<f64>,
    pub time_total_s: f64,
}

impl From<&IterationResult> for TrainingMetrics {
    fn from(result: &IterationResult) -> Self {
        Self {
            training_iteration: result.training_iteration,
            timesteps_total: result.timesteps_total,
            episode_reward_mean: result.episode_reward_mean,
            time_total_s: result.time_total_s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub experiment_name: String,
    pub run: String,
    pub env: String,
    #[serde(default)]
    pub metrics: TrainingMetrics,
    pub artifacts: Vec<TrainingArtifact>,
}

impl TrainingManifest {
    pub fn checkpoints(&self) -> impl Iterator<Item = &TrainingArtifact> {
        self.artifacts.iter().filter(|a| a.kind == ArtifactKind::Checkpoint)
    }
}

pub fn sha256_file(path: &Path) -> LaunchResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub fn make_artifact(kind: ArtifactKind, path: PathBuf) -> LaunchResult<TrainingArtifact> {
    if !path.exists() {
        return Err(LaunchError::Artifact(format!(
            "artifact path does not exist: {}",
            path.display()
        )));
    }

    let hash = sha256_file(&path)?;
    Ok(TrainingArtifact { kind, path, sha256: hash })
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> LaunchResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_make_artifact_hashes_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.json");
        std::fs::write(&path, "abc").unwrap();

        let artifact = make_artifact(ArtifactKind::ResultLog, path).unwrap();
        assert_eq!(artifact.sha256, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn test_make_artifact_missing_path() {
        let temp = TempDir::new().unwrap();
        assert!(make_artifact(ArtifactKind::ResultLog, temp.path().join("missing")).is_err());
    }
}
