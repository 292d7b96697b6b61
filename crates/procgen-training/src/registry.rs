//! Framework registries.
//!
//! Environments, algorithms, preprocessors and models are looked up by string
//! name when an experiment runs. Entries are inserted once at startup and
//! never replaced or removed.

use crate::algorithm::{Algorithm, AlgorithmFactory};
use crate::config::{AlgorithmConfig, ModelConfig};
use crate::error::{LaunchError, LaunchResult, RegistryKind};
use crate::model::{ModelBuilder, PolicyModel};
use crate::preprocessor::{Preprocessor, PreprocessorFactory};
use procgen_env::{EnvConfig, EnvResult, Environment, ProcgenEnv};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Creates an environment instance from `config.env_config`.
pub type EnvCreator = Arc<dyn Fn(&EnvConfig) -> EnvResult<Box<dyn Environment>> + Send + Sync>;

/// Creator for the unwrapped [`ProcgenEnv`].
#[must_use]
pub fn procgen_env_creator() -> EnvCreator {
    Arc::new(|config: &EnvConfig| -> EnvResult<Box<dyn Environment>> {
        Ok(Box::new(ProcgenEnv::new(config.clone())?))
    })
}

#[derive(Clone, Default)]
pub struct Registries {
    envs: BTreeMap<String, EnvCreator>,
    algorithms: BTreeMap<String, AlgorithmFactory>,
    preprocessors: BTreeMap<String, PreprocessorFactory>,
    models: BTreeMap<String, ModelBuilder>,
}

fn insert_once<T>(
    map: &mut BTreeMap<String, T>,
    kind: RegistryKind,
    name: String,
    value: T,
) -> LaunchResult<()> {
    if map.contains_key(&name) {
        return Err(LaunchError::DuplicateRegistration { kind, name });
    }
    debug!(kind = %kind, name = %name, "Registering component");
    map.insert(name, value);
    Ok(())
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, kind: RegistryKind, name: &str) -> LaunchResult<&'a T> {
    map.get(name).ok_or_else(|| LaunchError::Unregistered { kind, name: name.to_string() })
}

impl Registries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_env<F>(&mut self, name: impl Into<String>, creator: F) -> LaunchResult<()>
    where
        F: Fn(&EnvConfig) -> EnvResult<Box<dyn Environment>> + Send + Sync + 'static,
    {
        insert_once(&mut self.envs, RegistryKind::Env, name.into(), Arc::new(creator))
    }

    pub fn register_algorithm(&mut self, name: impl Into<String>, factory: AlgorithmFactory) -> LaunchResult<()> {
        insert_once(&mut self.algorithms, RegistryKind::Algorithm, name.into(), factory)
    }

    pub fn register_preprocessor(
        &mut self,
        name: impl Into<String>,
        factory: PreprocessorFactory,
    ) -> LaunchResult<()> {
        insert_once(&mut self.preprocessors, RegistryKind::Preprocessor, name.into(), factory)
    }

    pub fn register_model(&mut self, name: impl Into<String>, builder: ModelBuilder) -> LaunchResult<()> {
        insert_once(&mut self.models, RegistryKind::Model, name.into(), builder)
    }

    #[must_use]
    pub fn contains(&self, kind: RegistryKind, name: &str) -> bool {
        match kind {
            RegistryKind::Env => self.envs.contains_key(name),
            RegistryKind::Algorithm => self.algorithms.contains_key(name),
            RegistryKind::Preprocessor => self.preprocessors.contains_key(name),
            RegistryKind::Model => self.models.contains_key(name),
        }
    }

    /// Registered names of one kind, sorted.
    #[must_use]
    pub fn names(&self, kind: RegistryKind) -> Vec<&str> {
        match kind {
            RegistryKind::Env => self.envs.keys().map(String::as_str).collect(),
            RegistryKind::Algorithm => self.algorithms.keys().map(String::as_str).collect(),
            RegistryKind::Preprocessor => self.preprocessors.keys().map(String::as_str).collect(),
            RegistryKind::Model => self.models.keys().map(String::as_str).collect(),
        }
    }

    /// Fail unless `name` is registered as `kind`.
    pub fn require(&self, kind: RegistryKind, name: &str) -> LaunchResult<()> {
        if self.contains(kind, name) {
            Ok(())
        } else {
            Err(LaunchError::Unregistered { kind, name: name.to_string() })
        }
    }

    pub fn env_creator(&self, name: &str) -> LaunchResult<EnvCreator> {
        lookup(&self.envs, RegistryKind::Env, name).cloned()
    }

    pub fn make_env(&self, name: &str, config: &EnvConfig) -> LaunchResult<Box<dyn Environment>> {
        let creator = lookup(&self.envs, RegistryKind::Env, name)?;
        Ok(creator(config)?)
    }

    pub fn make_algorithm(&self, name: &str, config: &AlgorithmConfig) -> LaunchResult<Box<dyn Algorithm>> {
        let factory = lookup(&self.algorithms, RegistryKind::Algorithm, name)?;
        factory(config)
    }

    pub fn make_preprocessor(&self, name: &str) -> LaunchResult<Box<dyn Preprocessor>> {
        let factory = lookup(&self.preprocessors, RegistryKind::Preprocessor, name)?;
        Ok(factory())
    }

    pub fn build_model(
        &self,
        name: &str,
        obs_shape: &[usize],
        num_outputs: usize,
        config: &ModelConfig,
    ) -> LaunchResult<Box<dyn PolicyModel>> {
        let builder = lookup(&self.models, RegistryKind::Model, name)?;
        builder(obs_shape, num_outputs, config)
    }
}

impl fmt::Debug for Registries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registries")
            .field("envs", &self.names(RegistryKind::Env))
            .field("algorithms", &self.names(RegistryKind::Algorithm))
            .field("preprocessors", &self.names(RegistryKind::Preprocessor))
            .field("models", &self.names(RegistryKind::Model))
            .finish()
    }
}

/// Register every algorithm of a component bundle.
pub fn load_algorithms<I>(registries: &mut Registries, algorithms: I) -> LaunchResult<()>
where
    I: IntoIterator<Item = (String, AlgorithmFactory)>,
{
    for (name, factory) in algorithms {
        registries.register_algorithm(name, factory)?;
    }
    Ok(())
}

/// Register every preprocessor of a component bundle.
pub fn load_preprocessors<I>(registries: &mut Registries, preprocessors: I) -> LaunchResult<()>
where
    I: IntoIterator<Item = (String, PreprocessorFactory)>,
{
    for (name, factory) in preprocessors {
        registries.register_preprocessor(name, factory)?;
    }
    Ok(())
}
