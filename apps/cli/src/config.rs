//! Settings loading for the launcher binary.

use anyhow::{Context, Result};
use procgen_core::{LauncherSettings, SETTINGS_FILE};

/// Load `procgen-launch.toml` from the working directory, then environment
/// overrides. CLI arguments are applied by the caller.
pub fn load_settings() -> Result<LauncherSettings> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    LauncherSettings::discover_and_load(&cwd).with_context(|| format!("failed to load {SETTINGS_FILE}"))
}
