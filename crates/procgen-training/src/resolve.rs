//! Prioritized component resolution.
//!
//! A [`ResolutionChain`] tries each [`ComponentSource`] in order. The first
//! source that loads wins. Unavailable sources are skipped; a source that is
//! present but broken aborts resolution. Running out of sources is fatal.

use crate::algorithm::AlgorithmFactory;
use crate::error::{LaunchError, LaunchResult};
use crate::model::ModelBuilder;
use crate::preprocessor::PreprocessorFactory;
use crate::registry::{procgen_env_creator, EnvCreator};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Environment wrapper, algorithms, preprocessors and model classes supplied
/// by one source.
#[derive(Clone, Default)]
pub struct ComponentBundle {
    /// Name of the source that produced the bundle.
    pub source: String,
    pub algorithms: Vec<(String, AlgorithmFactory)>,
    pub preprocessors: Vec<(String, PreprocessorFactory)>,
    /// Model builders keyed by class name (not registry name).
    pub models: BTreeMap<String, ModelBuilder>,
    /// Replacement for the procgen environment wrapper, if the source ships one.
    pub env_wrapper: Option<EnvCreator>,
}

impl ComponentBundle {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_env_wrapper(mut self, creator: EnvCreator) -> Self {
        self.env_wrapper = Some(creator);
        self
    }

    #[must_use]
    pub fn with_algorithm(mut self, name: impl Into<String>, factory: AlgorithmFactory) -> Self {
        self.algorithms.push((name.into(), factory));
        self
    }

    #[must_use]
    pub fn with_preprocessor(mut self, name: impl Into<String>, factory: PreprocessorFactory) -> Self {
        self.preprocessors.push((name.into(), factory));
        self
    }

    #[must_use]
    pub fn with_model(mut self, class_name: impl Into<String>, builder: ModelBuilder) -> Self {
        self.models.insert(class_name.into(), builder);
        self
    }

    /// The bundle's environment wrapper, or [`ProcgenEnv`](procgen_env::ProcgenEnv) when it has none.
    #[must_use]
    pub fn env_creator(&self) -> EnvCreator {
        self.env_wrapper.clone().unwrap_or_else(procgen_env_creator)
    }

    /// Look up a model class the bundle is expected to provide.
    pub fn model(&self, class_name: &str) -> LaunchResult<ModelBuilder> {
        self.models.get(class_name).cloned().ok_or_else(|| LaunchError::ComponentSource {
            source_name: self.source.clone(),
            message: format!("missing model class {class_name}"),
        })
    }
}

impl fmt::Debug for ComponentBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBundle")
            .field("source", &self.source)
            .field("algorithms", &self.algorithms.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("preprocessors", &self.preprocessors.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("env_wrapper", &self.env_wrapper.is_some())
            .finish()
    }
}

/// Why a source did not produce a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source is not present in this build; try the next one.
    Unavailable(String),
    /// The source is present but failed to load.
    Broken(String),
}

/// A place component definitions can be loaded from.
pub trait ComponentSource: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Result<ComponentBundle, SourceError>;
}

/// Ordered list of sources; earlier sources take priority.
#[derive(Default)]
pub struct ResolutionChain {
    sources: Vec<Box<dyn ComponentSource>>,
}

impl ResolutionChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, source: impl ComponentSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn resolve(&self) -> LaunchResult<ComponentBundle> {
        let mut attempted = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.load() {
                Ok(bundle) => {
                    info!(source = %source.name(), fallbacks_skipped = attempted.len(), "Resolved components");
                    return Ok(bundle);
                }
                Err(SourceError::Unavailable(reason)) => {
                    debug!(source = %source.name(), reason = %reason, "Component source unavailable");
                    attempted.push(source.name().to_string());
                }
                Err(SourceError::Broken(message)) => {
                    return Err(LaunchError::ComponentSource { source_name: source.name().to_string(), message });
                }
            }
        }
        Err(LaunchError::ResolutionExhausted { attempted })
    }
}
