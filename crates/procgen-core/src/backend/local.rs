//! In-process rollout backend.
//!
//! Runs the trial on the local tokio runtime: rollout workers sample the
//! registered environment as blocking tasks, the registered algorithm
//! summarizes each iteration's batch, and results and checkpoints are
//! written under the [`TrainingLayout`].

use super::worker::RolloutWorker;
use async_trait::async_trait;
use procgen_training::artifacts::{make_artifact, write_json};
use procgen_training::{
    ArtifactKind, CheckpointRecord, ExperimentJob, IterationResult, LaunchError, LaunchResult, ProgressEvent,
    ProgressSink, Registries, RolloutBatch, RunProgress, Trainer, TrainerStatus, TrainingArtifact,
    TrainingJobId, TrainingLayout, TrainingManifest, TrainingMetrics,
};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Episodes averaged into `episode_reward_mean`.
const REWARD_WINDOW: usize = 100;

#[derive(Clone)]
pub struct LocalRolloutTrainer {
    output_root: PathBuf,
    statuses: Arc<Mutex<HashMap<String, TrainerStatus>>>,
}

impl LocalRolloutTrainer {
    #[must_use]
    pub fn new(output_root: PathBuf) -> Self {
        Self { output_root, statuses: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn layout(&self) -> TrainingLayout {
        TrainingLayout::new(self.output_root.clone())
    }

    fn set_status(&self, job_id: &TrainingJobId, status: TrainerStatus) {
        if let Ok(mut s) = self.statuses.lock() {
            s.insert(job_id.0.clone(), status);
        }
    }

    fn is_cancelled(&self, job_id: &TrainingJobId) -> bool {
        self.statuses
            .lock()
            .ok()
            .and_then(|s| s.get(&job_id.0).cloned())
            .is_some_and(|status| status == TrainerStatus::Cancelled)
    }

    async fn train(
        &self,
        job: &ExperimentJob,
        registries: &Registries,
        progress: &dyn ProgressSink,
    ) -> LaunchResult<TrainingManifest> {
        let job_id = job.job_id.clone();
        let trial = &job.definition.trial;
        let config = &trial.config.algorithm;
        let layout = self.layout();
        layout.ensure_job_dirs(&job_id)?;

        progress.on_event(ProgressEvent::Started { job_id: job_id.clone() });

        let experiment_path = layout.experiment_path(&job_id);
        write_json(&experiment_path, &job.definition)?;

        let creator = registries.env_creator(&trial.env)?;
        let mut algorithm = registries.make_algorithm(&trial.run, config)?;
        algorithm.validate(config)?;

        // Build the model once to check the architecture against the env.
        let sample_env = creator(&config.env_config)?;
        let mut obs_shape = sample_env.observation_space().shape;
        let num_actions = sample_env.action_space().n;
        drop(sample_env);
        if let Some(name) = &config.model.custom_preprocessor {
            obs_shape = registries.make_preprocessor(name)?.output_shape(&obs_shape);
        }
        if let Some(name) = &config.model.custom_model {
            let model = registries.build_model(name, &obs_shape, num_actions, &config.model)?;
            info!(model = %name, num_params = model.num_params(), features = ?model.feature_shape(), "Model built");
        }

        let num_workers = config.num_workers.max(1);
        let mut workers = (0..num_workers)
            .map(|index| RolloutWorker::new(index, &creator, &config.env_config))
            .collect::<LaunchResult<Vec<_>>>()?;

        if !self.is_cancelled(&job_id) {
            self.set_status(&job_id, TrainerStatus::Running);
        }
        progress.on_event(ProgressEvent::Message {
            job_id: job_id.clone(),
            message: format!("running {} with {num_workers} rollout workers on {}", trial.run, trial.env),
        });

        let result_path = layout.result_log_path(&job_id);
        let mut result_log = std::fs::File::create(&result_path)?;
        let mut checkpoints: Vec<TrainingArtifact> = Vec::new();
        let mut recent_returns: VecDeque<f32> = VecDeque::with_capacity(REWARD_WINDOW);
        let mut last_result = IterationResult::default();
        let started = Instant::now();
        let fragment_len = config.rollout_fragment_length as usize;
        let batch_size = config.train_batch_size as usize;
        let batch_mode = config.batch_mode;

        loop {
            if self.is_cancelled(&job_id) {
                info!(job_id = %job_id, iteration = last_result.training_iteration, "Training cancelled");
                break;
            }

            let iteration = last_result.training_iteration + 1;
            let mut batch = RolloutBatch::default();
            while batch.timesteps() < batch_size {
                let handles: Vec<_> = workers
                    .drain(..)
                    .map(|mut worker| {
                        tokio::task::spawn_blocking(move || {
                            let fragment = worker.sample(fragment_len, batch_mode);
                            (worker, fragment)
                        })
                    })
                    .collect();
                for handle in handles {
                    let (worker, fragment) = handle
                        .await
                        .map_err(|e| LaunchError::Trainer(format!("rollout worker failed: {e}")))?;
                    workers.push(worker);
                    batch.fragments.push(fragment?);
                }
            }

            let learner = algorithm.learn_on_batch(&batch)?;

            let episode_lengths: Vec<u32> = batch.episode_lengths().collect();
            for ret in batch.episode_returns() {
                if recent_returns.len() == REWARD_WINDOW {
                    recent_returns.pop_front();
                }
                recent_returns.push_back(ret);
            }
            let episode_reward_mean = (!recent_returns.is_empty())
                .then(|| recent_returns.iter().map(|r| f64::from(*r)).sum::<f64>() / recent_returns.len() as f64);
            let episode_len_mean = (!episode_lengths.is_empty()).then(|| {
                episode_lengths.iter().map(|l| f64::from(*l)).sum::<f64>() / episode_lengths.len() as f64
            });

            let timesteps_this_iter = batch.timesteps() as u64;
            last_result = IterationResult {
                training_iteration: iteration,
                timesteps_this_iter,
                timesteps_total: last_result.timesteps_total + timesteps_this_iter,
                episodes_this_iter: episode_lengths.len() as u64,
                episode_reward_mean,
                episode_len_mean,
                time_total_s: started.elapsed().as_secs_f64(),
                learner,
            };
            writeln!(result_log, "{}", serde_json::to_string(&last_result)?)?;

            info!(
                iteration,
                timesteps_total = last_result.timesteps_total,
                episode_reward_mean = ?last_result.episode_reward_mean,
                "Training iteration complete"
            );
            progress.on_event(ProgressEvent::Iteration {
                job_id: job_id.clone(),
                iteration,
                total: trial.stop.training_iteration,
                timesteps_total: last_result.timesteps_total,
                episode_reward_mean: last_result.episode_reward_mean,
            });

            let stop = trial.stop.is_met(&RunProgress {
                training_iteration: iteration,
                time_total_s: last_result.time_total_s,
                timesteps_total: last_result.timesteps_total,
                episode_reward_mean: last_result.episode_reward_mean,
            });
            let periodic = trial.checkpoint_freq > 0 && iteration % u64::from(trial.checkpoint_freq) == 0;
            if periodic || (stop && trial.checkpoint_at_end) {
                let artifact = self.write_checkpoint(&layout, &job_id, &last_result)?;
                progress.on_event(ProgressEvent::Checkpoint {
                    job_id: job_id.clone(),
                    iteration,
                    path: artifact.path.clone(),
                });
                checkpoints.push(artifact);
                prune_checkpoints(&mut checkpoints, trial.keep_checkpoints_num)?;
            }

            if stop {
                break;
            }
        }

        result_log.flush()?;
        drop(result_log);

        let mut artifacts = vec![
            make_artifact(ArtifactKind::ExperimentConfig, experiment_path)?,
            make_artifact(ArtifactKind::ResultLog, result_path)?,
        ];
        artifacts.extend(checkpoints);

        let manifest = TrainingManifest {
            job_id: job_id.clone(),
            created_at: chrono::Utc::now(),
            experiment_name: job.definition.name.clone(),
            run: trial.run.clone(),
            env: trial.env.clone(),
            metrics: TrainingMetrics::from(&last_result),
            artifacts,
        };
        write_json(layout.job_manifest_path(&job_id), &manifest)?;

        progress.on_event(ProgressEvent::Finished { job_id });
        Ok(manifest)
    }

    fn write_checkpoint(
        &self,
        layout: &TrainingLayout,
        job_id: &TrainingJobId,
        result: &IterationResult,
    ) -> LaunchResult<TrainingArtifact> {
        let path = layout.checkpoint_path(job_id, result.training_iteration);
        let record = CheckpointRecord {
            job_id: job_id.clone(),
            iteration: result.training_iteration,
            created_at: chrono::Utc::now(),
            result: result.clone(),
        };
        write_json(&path, &record)?;
        debug!(path = %path.display(), "Checkpoint written");
        make_artifact(ArtifactKind::Checkpoint, path)
    }
}

/// Drop the oldest checkpoints beyond `keep`.
fn prune_checkpoints(checkpoints: &mut Vec<TrainingArtifact>, keep: Option<u32>) -> LaunchResult<()> {
    let Some(keep) = keep.map(|k| k.max(1) as usize) else {
        return Ok(());
    };
    while checkpoints.len() > keep {
        let oldest = checkpoints.remove(0);
        std::fs::remove_file(&oldest.path)?;
    }
    Ok(())
}

#[async_trait]
impl Trainer for LocalRolloutTrainer {
    fn id(&self) -> &'static str {
        "local-rollout"
    }

    async fn prepare(&self, job: &ExperimentJob) -> LaunchResult<()> {
        if !self.is_cancelled(&job.job_id) {
            self.set_status(&job.job_id, TrainerStatus::Preparing);
        }
        self.layout().ensure_job_dirs(&job.job_id)?;
        Ok(())
    }

    async fn run(
        &self,
        job: &ExperimentJob,
        registries: &Registries,
        progress: &dyn ProgressSink,
    ) -> LaunchResult<TrainingManifest> {
        match self.train(job, registries, progress).await {
            Ok(manifest) => {
                if !self.is_cancelled(&job.job_id) {
                    self.set_status(&job.job_id, TrainerStatus::Finished);
                }
                Ok(manifest)
            }
            Err(e) => {
                self.set_status(&job.job_id, TrainerStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn status(&self, job_id: &TrainingJobId) -> LaunchResult<TrainerStatus> {
        Ok(self
            .statuses
            .lock()
            .ok()
            .and_then(|s| s.get(&job_id.0).cloned())
            .unwrap_or(TrainerStatus::Idle))
    }

    async fn cancel(&self, job_id: &TrainingJobId) -> LaunchResult<()> {
        self.set_status(job_id, TrainerStatus::Cancelled);
        Ok(())
    }
}
