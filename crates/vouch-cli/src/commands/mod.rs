//! CLI command handlers

pub mod check_config;
pub mod simulate;

use anyhow::{Context, Result};
use std::path::Path;
use vouch_core::VouchConfig;

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<VouchConfig> {
    let config = VouchConfig::load_from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}
