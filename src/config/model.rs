// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::parse_duration;
use crate::watch::controller::DEFAULT_SHUTDOWN_GRACE;
use crate::watch::queue::DEFAULT_EVENT_QUEUE_CAPACITY;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// event_queue_capacity = 100
/// shutdown_grace = "10s"
///
/// [pipeline.dev]
/// run = """
/// run_watch -p 'src/**/*.rs' --fail-on-error -- cargo run
/// """
/// ```
///
/// All sections are optional at the serde level; validation requires at
/// least one pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Session-wide behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All pipelines from `[pipeline.<name>]`.
    #[serde(default)]
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

/// A validated configuration. Only constructed through
/// `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        pipeline: BTreeMap<String, PipelineConfig>,
    ) -> Self {
        Self { config, pipeline }
    }

    /// A configuration without pipelines, for running `run_watch` directly.
    pub fn empty() -> Self {
        Self::new_unchecked(ConfigSection::default(), BTreeMap::new())
    }

    pub fn pipelines(&self) -> &BTreeMap<String, PipelineConfig> {
        &self.pipeline
    }

    pub fn get_pipeline(&self, name: &str) -> Option<&PipelineConfig> {
        self.pipeline.get(name)
    }

    /// Watch-session settings derived from `[config]`.
    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            event_queue_capacity: self.config.event_queue_capacity,
            shutdown_grace: self
                .config
                .shutdown_grace
                .as_deref()
                .and_then(|s| parse_duration(s).ok())
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Pending change events buffered per watch session before new ones are
    /// dropped.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// How long to wait for a killed command during shutdown, e.g. `"10s"`.
    #[serde(default)]
    pub shutdown_grace: Option<String>,
}

fn default_event_queue_capacity() -> usize {
    DEFAULT_EVENT_QUEUE_CAPACITY
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            event_queue_capacity: default_event_queue_capacity(),
            shutdown_grace: None,
        }
    }
}

/// `[pipeline.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Script text; one step per non-blank line, `#` lines are comments.
    pub run: String,

    #[serde(default)]
    pub description: Option<String>,

    /// A failing step is logged and the pipeline carries on.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Extra flags accepted by `runwatch pipeline <name> -- ...`.
    #[serde(default)]
    pub flags: Vec<PipelineFlagConfig>,
}

impl PipelineConfig {
    /// The executable lines of `run`, trimmed.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.run
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
    }
}

/// One `[[pipeline.<name>.flags]]` entry.
///
/// ```toml
/// [[pipeline.deploy.flags]]
/// name = "namespace"
/// short = "n"
/// type = "string"
/// default = "dev"
/// description = "Namespace to deploy into"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineFlagConfig {
    pub name: String,

    /// Single-character shorthand, e.g. `"n"` for `-n`.
    #[serde(default)]
    pub short: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: PipelineFlagType,

    /// Must match `kind`; the type's zero value when absent.
    #[serde(default)]
    pub default: Option<toml::Value>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Value type of a pipeline flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum PipelineFlagType {
    #[default]
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "stringArray")]
    StringArray,
}

impl PipelineFlagType {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineFlagType::Bool => "bool",
            PipelineFlagType::Int => "int",
            PipelineFlagType::String => "string",
            PipelineFlagType::StringArray => "stringArray",
        }
    }

    /// True if `value` is a valid default for this type.
    pub fn accepts(self, value: &toml::Value) -> bool {
        match (self, value) {
            (PipelineFlagType::Bool, toml::Value::Boolean(_))
            | (PipelineFlagType::Int, toml::Value::Integer(_))
            | (PipelineFlagType::String, toml::Value::String(_)) => true,
            (PipelineFlagType::StringArray, toml::Value::Array(items)) => {
                items.iter().all(toml::Value::is_str)
            }
            _ => false,
        }
    }
}

/// Settings every watch session inherits from the enclosing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub event_queue_capacity: usize,
    pub shutdown_grace: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
