use crate::experiment::ExperimentDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An experiment definition handed to a trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentJob {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub definition: ExperimentDefinition,
}

impl ExperimentJob {
    #[must_use]
    pub fn new(definition: ExperimentDefinition) -> Self {
        Self { job_id: TrainingJobId::new(), created_at: Utc::now(), definition }
    }
}
