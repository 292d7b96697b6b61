//! Integration tests for the local rollout backend.

use procgen_core::components::{component_chain, framework_registries, VISION_NETWORK_CLASS};
use procgen_core::LocalRolloutTrainer;
use procgen_env::{EnvConfig, Environment, FrameStack, ProcgenEnv};
use procgen_training::{
    load_algorithms, load_preprocessors, CheckpointRecord, ExperimentBuilder, ExperimentDefinition,
    ExperimentJob, IterationResult, ProgressEvent, ProgressSink, Registries, Trainer, TrainerStatus,
    TrainingLayout, BASE_ENV_NAME,
};
use serde_json::{json, Value};
use std::sync::Mutex;
use tempfile::TempDir;

fn registries() -> Registries {
    let mut registries = framework_registries().unwrap();
    registries
        .register_env(BASE_ENV_NAME, |config: &EnvConfig| {
            Ok(Box::new(ProcgenEnv::new(config.clone())?) as Box<dyn Environment>)
        })
        .unwrap();
    registries
        .register_env("stacked_procgen_env", |config: &EnvConfig| {
            Ok(Box::new(FrameStack::new(ProcgenEnv::new(config.clone())?, 4)?) as Box<dyn Environment>)
        })
        .unwrap();

    let bundle = component_chain().resolve().unwrap();
    let model = bundle.model(VISION_NETWORK_CLASS).unwrap();
    load_algorithms(&mut registries, bundle.algorithms).unwrap();
    load_preprocessors(&mut registries, bundle.preprocessors).unwrap();
    registries.register_model("my_vision_network", model).unwrap();
    registries
}

fn definition(overrides: Value) -> ExperimentDefinition {
    let mut params = json!({
        "ray_num_cpus": 4,
        "ray_num_gpus": 0,
        "eager": false,
        "v": true,
        "experiment_name": "training",
        "run": "PPO",
        "env": BASE_ENV_NAME,
        "stop": {"training_iteration": 3},
        "checkpoint_freq": 1,
        "config": {
            "num_workers": 2,
            "rollout_fragment_length": 20,
            "train_batch_size": 40,
            "model": {
                "custom_model": "my_vision_network",
                "conv_filters": [[16, [5, 5], 4], [32, [3, 3], 1], [256, [3, 3], 1]]
            }
        }
    });
    if let (Some(params), Value::Object(overrides)) = (params.as_object_mut(), overrides) {
        params.extend(overrides);
    }
    let Value::Object(params) = params else { unreachable!() };
    let def = ExperimentBuilder::new(params).unwrap().experiment_definition().unwrap();
    def.validate_against(&registries()).unwrap();
    def
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for CollectingSink {
    fn on_event(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl CollectingSink {
    fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

#[tokio::test]
async fn test_runs_to_stop_with_checkpoint_every_iteration() {
    let temp = TempDir::new().unwrap();
    let trainer = LocalRolloutTrainer::new(temp.path().to_path_buf());
    let job = ExperimentJob::new(definition(json!({})));
    let sink = CollectingSink::default();

    trainer.prepare(&job).await.unwrap();
    let manifest = trainer.run(&job, &registries(), &sink).await.unwrap();

    assert_eq!(manifest.metrics.training_iteration, 3);
    assert!(manifest.metrics.timesteps_total >= 120);
    assert_eq!(manifest.checkpoints().count(), 3);
    assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Finished);
    assert_eq!(sink.count(|e| matches!(e, ProgressEvent::Iteration { .. })), 3);
    assert_eq!(sink.count(|e| matches!(e, ProgressEvent::Checkpoint { .. })), 3);

    let layout = TrainingLayout::new(temp.path().to_path_buf());
    assert!(layout.job_manifest_path(&job.job_id).is_file());
    assert!(layout.experiment_path(&job.job_id).is_file());

    let log = std::fs::read_to_string(layout.result_log_path(&job.job_id)).unwrap();
    let results: Vec<IterationResult> = log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(results.iter().map(|r| r.training_iteration).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(results.iter().all(|r| r.timesteps_this_iter >= 40));
    assert!(results[0].learner.contains_key("advantage_mean"));

    let checkpoint = std::fs::read_to_string(layout.checkpoint_path(&job.job_id, 2)).unwrap();
    let record: CheckpointRecord = serde_json::from_str(&checkpoint).unwrap();
    assert_eq!(record.iteration, 2);
    assert_eq!(record.job_id, job.job_id);
}

#[tokio::test]
async fn test_checkpoint_frequency_and_at_end() {
    let temp = TempDir::new().unwrap();
    let trainer = LocalRolloutTrainer::new(temp.path().to_path_buf());
    let job = ExperimentJob::new(definition(json!({"checkpoint_freq": 2, "checkpoint_at_end": true})));

    let manifest = trainer.run(&job, &registries(), &CollectingSink::default()).await.unwrap();
    let layout = TrainingLayout::new(temp.path().to_path_buf());
    let paths: Vec<_> = manifest.checkpoints().map(|a| a.path.clone()).collect();
    assert_eq!(paths, vec![layout.checkpoint_path(&job.job_id, 2), layout.checkpoint_path(&job.job_id, 3)]);
}

#[tokio::test]
async fn test_stacked_env_with_random_agent_and_preprocessor() {
    let temp = TempDir::new().unwrap();
    let trainer = LocalRolloutTrainer::new(temp.path().to_path_buf());
    let job = ExperimentJob::new(definition(json!({
        "run": "custom/CustomRandomAgent",
        "env": "stacked_procgen_env",
        "stop": {"timesteps_total": 50},
        "checkpoint_freq": 0,
        "config": {
            "num_workers": 1,
            "rollout_fragment_length": 25,
            "train_batch_size": 25,
            "batch_mode": "complete_episodes",
            "model": {
                "custom_model": "my_vision_network",
                "custom_preprocessor": "MyPreprocessor",
                "conv_filters": [[16, [5, 5], 4], [32, [3, 3], 1], [256, [3, 3], 1]]
            }
        }
    })));

    let manifest = trainer.run(&job, &registries(), &CollectingSink::default()).await.unwrap();
    assert!(manifest.metrics.timesteps_total >= 50);
    assert_eq!(manifest.checkpoints().count(), 0);
    assert_eq!(manifest.env, "stacked_procgen_env");
}

#[tokio::test]
async fn test_cancel_stops_at_iteration_boundary() {
    let temp = TempDir::new().unwrap();
    let trainer = LocalRolloutTrainer::new(temp.path().to_path_buf());
    let job = ExperimentJob::new(definition(json!({})));

    trainer.prepare(&job).await.unwrap();
    assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Preparing);
    trainer.cancel(&job.job_id).await.unwrap();

    let manifest = trainer.run(&job, &registries(), &CollectingSink::default()).await.unwrap();
    assert_eq!(manifest.metrics.training_iteration, 0);
    assert_eq!(manifest.checkpoints().count(), 0);
    assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_before_prepare_is_kept() {
    let temp = TempDir::new().unwrap();
    let trainer = LocalRolloutTrainer::new(temp.path().to_path_buf());
    let job = ExperimentJob::new(definition(json!({})));

    trainer.cancel(&job.job_id).await.unwrap();
    trainer.prepare(&job).await.unwrap();
    assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Cancelled);

    let manifest = trainer.run(&job, &registries(), &CollectingSink::default()).await.unwrap();
    assert_eq!(manifest.metrics.training_iteration, 0);
    assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Cancelled);
}

#[tokio::test]
async fn test_invalid_model_fails_run() {
    let temp = TempDir::new().unwrap();
    let trainer = LocalRolloutTrainer::new(temp.path().to_path_buf());
    let mut def = definition(json!({}));
    def.trial.config.algorithm.model.conv_filters.clear();
    let job = ExperimentJob::new(def);

    assert!(trainer.run(&job, &registries(), &CollectingSink::default()).await.is_err());
    assert!(matches!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Failed(_)));
}

#[tokio::test]
async fn test_status_of_unknown_job_is_idle() {
    let trainer = LocalRolloutTrainer::new(std::env::temp_dir());
    let job = ExperimentJob::new(definition(json!({})));
    assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Idle);
}
