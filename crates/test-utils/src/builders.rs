#![allow(dead_code)]

use std::fmt::Write;

use runwatch::config::{ConfigFile, RawConfigFile};

/// Builder producing config TOML, so tests exercise the real deserializer.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_section: Vec<String>,
    pipelines: Vec<PipelineBuilder>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.config_section
            .push(format!("event_queue_capacity = {capacity}"));
        self
    }

    pub fn shutdown_grace(mut self, grace: &str) -> Self {
        self.config_section.push(format!("shutdown_grace = {grace:?}"));
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineBuilder) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        if !self.config_section.is_empty() {
            out.push_str("[config]\n");
            for line in &self.config_section {
                let _ = writeln!(out, "{line}");
            }
            out.push('\n');
        }
        for p in &self.pipelines {
            let _ = writeln!(out, "[pipeline.{}]", p.name);
            let _ = writeln!(out, "continue_on_error = {}", p.continue_on_error);
            let _ = writeln!(out, "run = '''\n{}\n'''\n", p.steps.join("\n"));
            for flag in &p.flags {
                let _ = writeln!(out, "[[pipeline.{}.flags]]\n{flag}\n", p.name);
            }
        }
        out
    }

    pub fn build_raw(&self) -> RawConfigFile {
        toml::from_str(&self.to_toml()).expect("builder produced invalid TOML")
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.build_raw()).expect("Failed to build valid config from builder")
    }
}

/// Builder for one `[pipeline.<name>]` section.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    steps: Vec<String>,
    continue_on_error: bool,
    flags: Vec<String>,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
            continue_on_error: false,
            flags: Vec::new(),
        }
    }

    pub fn step(mut self, line: &str) -> Self {
        self.steps.push(line.to_string());
        self
    }

    /// Add a `[[pipeline.<name>.flags]]` table; `body` holds its TOML keys.
    pub fn flag(mut self, body: &str) -> Self {
        self.flags.push(body.to_string());
        self
    }

    pub fn continue_on_error(mut self, val: bool) -> Self {
        self.continue_on_error = val;
        self
    }
}
