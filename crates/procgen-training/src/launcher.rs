//! Launch sequence.
//!
//! A [`Launcher`] supplies registration callbacks and the two configuration
//! mappings. [`Launcher::launch`] runs them in order (base environment,
//! launcher environments, algorithms/preprocessors/model, experiment
//! assembly, registry validation) and [`train_main`] hands the result to a
//! [`Trainer`].

use crate::artifacts::TrainingManifest;
use crate::config::{merge_params, ResourceConfig, RunConfig};
use crate::error::LaunchResult;
use crate::experiment::{ExperimentBuilder, ExperimentDefinition};
use crate::job::ExperimentJob;
use crate::progress::ProgressSink;
use crate::registry::{procgen_env_creator, EnvCreator, Registries};
use crate::trainer::Trainer;
use procgen_env::EnvConfig;
use tracing::info;

/// Registry name of the unwrapped procgen environment.
pub const BASE_ENV_NAME: &str = "procgen_env_wrapper";

/// Registries and experiment definition ready for a trainer.
#[derive(Debug)]
pub struct LaunchPlan {
    pub registries: Registries,
    pub definition: ExperimentDefinition,
}

pub trait Launcher: Send + Sync {
    /// Register launcher-specific environments.
    fn register_env_creator(&self, registries: &mut Registries) -> LaunchResult<()>;

    /// Register algorithms, preprocessors and the custom model.
    fn register_algorithms_and_preprocessors(&self, registries: &mut Registries) -> LaunchResult<()>;

    fn resource_config(&self) -> ResourceConfig;

    fn run_config(&self) -> RunConfig;

    /// The environment wrapper registered as [`BASE_ENV_NAME`].
    fn env_wrapper(&self) -> LaunchResult<EnvCreator> {
        Ok(procgen_env_creator())
    }

    fn register_base_env(&self, registries: &mut Registries) -> LaunchResult<()> {
        let creator = self.env_wrapper()?;
        registries.register_env(BASE_ENV_NAME, move |config: &EnvConfig| creator(config))
    }

    fn experiment_config(&self) -> LaunchResult<ExperimentDefinition> {
        let params = merge_params(&self.resource_config(), &self.run_config())?;
        ExperimentBuilder::new(params)?.experiment_definition()
    }

    fn launch(&self, mut registries: Registries) -> LaunchResult<LaunchPlan> {
        self.register_base_env(&mut registries)?;
        self.register_env_creator(&mut registries)?;
        self.register_algorithms_and_preprocessors(&mut registries)?;

        let definition = self.experiment_config()?;
        definition.validate_against(&registries)?;
        info!(
            experiment = %definition.name,
            run = %definition.trial.run,
            env = %definition.trial.env,
            "Experiment assembled"
        );
        Ok(LaunchPlan { registries, definition })
    }
}

/// Launch and train to completion.
pub async fn train_main<L>(
    launcher: &L,
    registries: Registries,
    trainer: &dyn Trainer,
    progress: &dyn ProgressSink,
) -> LaunchResult<TrainingManifest>
where
    L: Launcher + ?Sized,
{
    let plan = launcher.launch(registries)?;
    let job = ExperimentJob::new(plan.definition);
    info!(job_id = %job.job_id, trainer = trainer.id(), "Starting training job");

    trainer.prepare(&job).await?;
    trainer.run(&job, &plan.registries, progress).await
}
