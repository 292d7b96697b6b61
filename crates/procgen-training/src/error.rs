use procgen_env::EnvError;
use std::fmt;
use thiserror::Error;

pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

/// Which framework registry a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Env,
    Algorithm,
    Preprocessor,
    Model,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Env => "environment",
            Self::Algorithm => "algorithm",
            Self::Preprocessor => "preprocessor",
            Self::Model => "model",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid experiment config: {0}")]
    InvalidConfig(String),

    #[error("{kind} '{name}' is not registered")]
    Unregistered { kind: RegistryKind, name: String },

    #[error("{kind} '{name}' is already registered")]
    DuplicateRegistration { kind: RegistryKind, name: String },

    #[error("no component source could be resolved (tried: {})", attempted.join(", "))]
    ResolutionExhausted { attempted: Vec<String> },

    #[error("component source '{source_name}' failed to load: {message}")]
    ComponentSource { source_name: String, message: String },

    #[error("model build error: {0}")]
    Model(String),

    #[error("trainer error: {0}")]
    Trainer(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
