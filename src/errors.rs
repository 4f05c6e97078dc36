// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunwatchError {
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Cycle detected in pipelines: {0}")]
    PipelineCycle(String),

    #[error("invalid watch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("cannot watch {}: {reason}", path.display())]
    WatchRoot { path: PathBuf, reason: String },

    #[error("file watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("a supervised task is still alive; kill and await it before starting another")]
    TaskOverlap,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Terminal error of the supervised action, surfaced unchanged.
    #[error(transparent)]
    Action(anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunwatchError {
    /// Error for a watch root that does not exist on disk.
    pub fn missing_root(path: impl Into<PathBuf>) -> Self {
        RunwatchError::WatchRoot {
            path: path.into(),
            reason: "the directory or file must exist".to_string(),
        }
    }

    /// Convert for callers that speak `anyhow`, unwrapping errors that
    /// already are one so messages are not wrapped twice.
    pub fn into_anyhow(self) -> anyhow::Error {
        match self {
            RunwatchError::Action(err) | RunwatchError::Other(err) => err,
            other => anyhow::Error::new(other),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunwatchError>;
