//! Procgen Core
//!
//! Concrete pieces behind the launch primitives in `procgen-training`:
//! - Framework registries seeded with built-in algorithms
//! - The custom/default component bundles and their sources
//! - The local rollout training backend
//! - Launcher settings (file + environment overrides)

pub mod backend;
pub mod components;
pub mod settings;

pub use backend::LocalRolloutTrainer;
pub use components::{
    component_chain, framework_registries, CustomComponents, CustomRandomAgent, DefaultComponents,
    MyPreprocessor, MyVisionNetwork, Ppo,
};
pub use settings::{BackendKind, LauncherSettings, SettingsError, SETTINGS_FILE};
