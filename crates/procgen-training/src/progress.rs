use crate::job::TrainingJobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { job_id: TrainingJobId },
    Message { job_id: TrainingJobId, message: String },
    Iteration {
        job_id: TrainingJobId,
        iteration: u64,
        total: Option<u64>,
        timesteps_total: u64,
        episode_reward_mean: Option<f64>,
    },
    Checkpoint { job_id: TrainingJobId, iteration: u64, path: PathBuf },
    Finished { job_id: TrainingJobId },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { job_id } => println!("[train:{job_id}] started"),
            ProgressEvent::Message { job_id, message } => println!("[train:{job_id}] {message}"),
            ProgressEvent::Iteration { job_id, iteration, total, timesteps_total, episode_reward_mean } => {
                let reward = episode_reward_mean.map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}"));
                if let Some(total) = total {
                    println!(
                        "[train:{job_id}] iteration {iteration}/{total} timesteps={timesteps_total} reward_mean={reward}"
                    );
                } else {
                    println!("[train:{job_id}] iteration {iteration} timesteps={timesteps_total} reward_mean={reward}");
                }
            }
            ProgressEvent::Checkpoint { job_id, iteration, path } => {
                println!("[train:{job_id}] checkpoint {iteration} -> {}", path.display());
            }
            ProgressEvent::Finished { job_id } => println!("[train:{job_id}] finished"),
        }
    }
}
