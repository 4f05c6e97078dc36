// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RunwatchError};

/// Read and deserialize `path` without checking pipeline references.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        RunwatchError::ConfigError(format!("reading {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read `path` and validate it: at least one non-empty pipeline, sane
/// `[config]` values, and `run_pipelines` references that exist and do not
/// form a cycle.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Runwatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Runwatch.toml")
}
