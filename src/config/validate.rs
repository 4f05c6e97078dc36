// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::builtins::RUN_PIPELINES;
use crate::config::model::{ConfigFile, PipelineConfig, RawConfigFile};
use crate::errors::{Result, RunwatchError};
use crate::exec::parse_duration;
use crate::pipeline::script::split_words;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RunwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.pipeline))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_pipelines(cfg)?;
    validate_global_config(cfg)?;
    for (name, pipeline) in cfg.pipeline.iter() {
        validate_pipeline_flags(name, pipeline)?;
    }
    let edges = collect_pipeline_references(cfg)?;
    validate_reference_graph(cfg, &edges)?;
    Ok(())
}

fn ensure_has_pipelines(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.is_empty() {
        return Err(RunwatchError::ConfigError(
            "config must contain at least one [pipeline.<name>] section".to_string(),
        ));
    }
    for (name, pipeline) in cfg.pipeline.iter() {
        if pipeline.steps().next().is_none() {
            return Err(RunwatchError::ConfigError(format!(
                "pipeline '{name}' has an empty `run`"
            )));
        }
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.event_queue_capacity == 0 {
        return Err(RunwatchError::ConfigError(
            "[config].event_queue_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(grace) = cfg.config.shutdown_grace.as_deref() {
        parse_duration(grace).map_err(|e| {
            RunwatchError::ConfigError(format!("[config].shutdown_grace: {e}"))
        })?;
    }

    Ok(())
}

fn validate_pipeline_flags(name: &str, pipeline: &PipelineConfig) -> Result<()> {
    let err = |msg: String| RunwatchError::ConfigError(format!("pipeline '{name}': {msg}"));
    let mut names = HashSet::new();
    let mut shorts = HashSet::new();

    for flag in &pipeline.flags {
        let valid_name = flag.name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && flag
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(err(format!(
                "invalid flag name '{}' (letters, digits, '-' and '_' only)",
                flag.name
            )));
        }
        if flag.name == "help" {
            return Err(err("flag name 'help' is reserved".to_string()));
        }
        if !names.insert(flag.name.as_str()) {
            return Err(err(format!("duplicate flag '{}'", flag.name)));
        }

        if let Some(short) = flag.short.as_deref() {
            let mut chars = short.chars();
            let c = match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => c,
                _ => {
                    return Err(err(format!(
                        "flag '{}': short must be one letter or digit (got '{short}')",
                        flag.name
                    )));
                }
            };
            if c == 'h' {
                return Err(err(format!("flag '{}': short 'h' is reserved", flag.name)));
            }
            if !shorts.insert(c) {
                return Err(err(format!("duplicate short flag '-{c}'")));
            }
        }

        if let Some(default) = &flag.default {
            if !flag.kind.accepts(default) {
                return Err(err(format!(
                    "flag '{}': default {default} is not a {}",
                    flag.name,
                    flag.kind.as_str()
                )));
            }
        }
    }

    Ok(())
}

/// `(caller, callee)` pairs for every `run_pipelines` step.
fn collect_pipeline_references(cfg: &RawConfigFile) -> Result<Vec<(String, String)>> {
    let mut edges = Vec::new();

    for (name, pipeline) in cfg.pipeline.iter() {
        for step in pipeline.steps() {
            let words = split_words(step).map_err(|e| {
                RunwatchError::ConfigError(format!("pipeline '{name}': {e}"))
            })?;
            let Some((first, targets)) = words.split_first() else {
                continue;
            };
            if first != RUN_PIPELINES {
                continue;
            }

            for target in targets {
                if !cfg.pipeline.contains_key(target) {
                    return Err(RunwatchError::ConfigError(format!(
                        "pipeline '{name}' runs unknown pipeline '{target}'"
                    )));
                }
                if target == name {
                    return Err(RunwatchError::ConfigError(format!(
                        "pipeline '{name}' cannot run itself"
                    )));
                }
                edges.push((name.clone(), target.clone()));
            }
        }
    }

    Ok(edges)
}

fn validate_reference_graph(cfg: &RawConfigFile, edges: &[(String, String)]) -> Result<()> {
    // Edge direction: caller -> callee.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.pipeline.keys() {
        graph.add_node(name.as_str());
    }
    for (from, to) in edges {
        graph.add_edge(from.as_str(), to.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(RunwatchError::PipelineCycle(format!(
            "cycle detected in run_pipelines references involving pipeline '{}'",
            cycle.node_id()
        ))),
    }
}
