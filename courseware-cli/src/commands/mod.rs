pub mod course;
pub mod refresh;
pub mod status;

use anyhow::{Context, Result};

use courseware_core::{config, Settings};

/// Settings from `~/.courseware/config.yaml`, or defaults.
pub(crate) fn settings() -> Result<Settings> {
    config::load().context("failed to load ~/.courseware/config.yaml")
}
