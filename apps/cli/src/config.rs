//! CLI configuration loading and merging.

use anyhow::{Context, Result};
use probe_eval::ProbeConfig;
use std::path::{Path, PathBuf};

/// Global flags that take precedence over every configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub results_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Load and merge configuration.
///
/// Configuration precedence:
/// 1. CLI arguments
/// 2. Explicit `--config` file
/// 3. Local config file (./probe.toml)
/// 4. Global config file (~/.probe/config.toml)
/// 5. Defaults
pub fn load_config(explicit: Option<&Path>, overrides: Overrides) -> Result<ProbeConfig> {
    let mut config = ProbeConfig::discover_and_load(explicit).context("Failed to load configuration")?;

    if let Some(root) = overrides.results_root {
        config.results_root = root;
    }
    if let Some(dir) = overrides.data_dir {
        config.data_dir = dir;
    }
    if overrides.log_level.is_some() {
        config.log_level = overrides.log_level;
    }

    Ok(config)
}
