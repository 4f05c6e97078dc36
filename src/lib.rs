// src/lib.rs

pub mod builtins;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::builtins::WatchEnv;
use crate::cli::{CliArgs, Command};
use crate::config::{default_config_path, load_and_validate, ConfigFile, PipelineFlagConfig};
use crate::errors::Result;
use crate::pipeline::Interpreter;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (pipeline commands only)
/// - the pipeline interpreter / `run_watch` builtin
/// - Ctrl-C handling, which cancels every running session
pub async fn run(args: CliArgs) -> Result<()> {
    let working_dir = std::env::current_dir()?;
    let cancel = CancellationToken::new();

    // Ctrl-C → graceful shutdown.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; shutting down");
            cancel.cancel();
        });
    }

    match args.command {
        Command::RunWatch(rw) => {
            // A config is optional here; with one, the supervised command may
            // run its pipelines.
            let cfg = args
                .config
                .as_deref()
                .map(load_and_validate)
                .transpose()?
                .unwrap_or_else(ConfigFile::empty);
            let env = WatchEnv::new(&working_dir).with_settings(cfg.watch_settings());
            let handler = Arc::new(Interpreter::new(cfg, env.clone()));
            builtins::supervise(cancel, &rw, handler, &env).await
        }
        Command::Pipeline { name, args: flag_args } => {
            let config_path = config_path(args.config.as_deref());
            let cfg = load_and_validate(&config_path)?;
            let env = WatchEnv::new(config_root_dir(&config_path, &working_dir))
                .with_settings(cfg.watch_settings());
            Interpreter::new(cfg, env)
                .run_pipeline_with_args(&name, &flag_args, cancel)
                .await
        }
        Command::DryRun => {
            let cfg = load_and_validate(config_path(args.config.as_deref()))?;
            print_dry_run(&cfg);
            Ok(())
        }
    }
}

fn config_path(flag: Option<&str>) -> PathBuf {
    flag.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Relative patterns in a pipeline resolve against the config's directory.
///
/// A bare filename like "Runwatch.toml" (parent = "") falls back to the
/// current working directory.
fn config_root_dir(config_path: &Path, working_dir: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => working_dir.join(parent),
        _ => working_dir.to_path_buf(),
    }
}

/// Simple dry-run output: print pipelines and their steps.
fn print_dry_run(cfg: &ConfigFile) {
    let settings = cfg.watch_settings();
    println!("runwatch dry-run");
    println!("  config.event_queue_capacity = {}", settings.event_queue_capacity);
    println!("  config.shutdown_grace = {:?}", settings.shutdown_grace);
    println!();

    println!("pipelines ({}):", cfg.pipelines().len());
    for (name, pipeline) in cfg.pipelines() {
        println!("  - {name}");
        if let Some(ref description) = pipeline.description {
            println!("      description: {description}");
        }
        if pipeline.continue_on_error {
            println!("      continue_on_error: true");
        }
        for flag in &pipeline.flags {
            println!("      flag: {}", describe_flag(flag));
        }
        for step in pipeline.steps() {
            println!("      run: {step}");
        }
    }

    debug!("dry-run complete (no execution)");
}

/// One-line flag summary, e.g. `--namespace, -n <string> (default: "dev") Target namespace`.
fn describe_flag(flag: &PipelineFlagConfig) -> String {
    let mut out = format!("--{}", flag.name);
    if let Some(ref short) = flag.short {
        out.push_str(&format!(", -{short}"));
    }
    out.push_str(&format!(" <{}>", flag.kind.as_str()));
    if let Some(ref default) = flag.default {
        out.push_str(&format!(" (default: {default})"));
    }
    if let Some(ref description) = flag.description {
        out.push_str(&format!(" {description}"));
    }
    out
}
