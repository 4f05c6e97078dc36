// src/builtins/run_watch.rs

//! `run_watch --path PATTERN... [--fail-on-error] [--skip-initial] [--silent] -- CMD...`

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::WatchSettings;
use crate::errors::{Result, RunwatchError};
use crate::exec::{action, Action, ExecHandler};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::controller::{Controller, WatchOptions};
use crate::watch::notifier::Notifier;
use crate::watch::patterns::WatchPlan;
use crate::watch::queue::event_queue;
use crate::watch::reporter::{RestartReporter, StderrReporter};

use super::RUN_WATCH;

pub const USAGE: &str = "usage: run_watch --path MY_PATH -- my_command";

/// Arguments of the `run_watch` builtin.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "run_watch", about = "Run a command and restart it when watched files change.")]
pub struct RunWatchArgs {
    /// The paths to watch. Can be patterns in the form of ./**/my-file.txt
    #[arg(long = "path", short = 'p', value_name = "PATTERN")]
    pub paths: Vec<String>,

    /// Fail if the command exits with an error instead of waiting for the
    /// next change.
    #[arg(long)]
    pub fail_on_error: bool,

    /// Do not run the command until the first change.
    #[arg(long)]
    pub skip_initial: bool,

    /// Do not print a notice when the command is restarted.
    #[arg(long)]
    pub silent: bool,

    /// The command to supervise.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl RunWatchArgs {
    /// Parse the builtin's words (without the leading `run_watch`).
    pub fn parse_words(words: &[String]) -> Result<Self> {
        let argv = std::iter::once(RUN_WATCH.to_string()).chain(words.iter().cloned());
        let args = Self::try_parse_from(argv).map_err(|e| {
            RunwatchError::Usage(format!("parse args: {}", e.to_string().trim_end()))
        })?;
        args.validate()?;
        Ok(args)
    }

    /// Patterns and a command are both required.
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() || self.command.is_empty() {
            return Err(RunwatchError::Usage(USAGE.to_string()));
        }
        Ok(())
    }

    pub fn options(&self) -> WatchOptions {
        WatchOptions {
            fail_on_error: self.fail_on_error,
            skip_initial: self.skip_initial,
            silent: self.silent,
        }
    }
}

/// Everything a watch session borrows from its caller.
#[derive(Clone)]
pub struct WatchEnv {
    /// Directory relative patterns are resolved against.
    pub working_dir: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub settings: WatchSettings,
    pub reporter: Arc<dyn RestartReporter>,
}

impl std::fmt::Debug for WatchEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEnv")
            .field("working_dir", &self.working_dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl WatchEnv {
    /// Real filesystem, stderr notices, default settings.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            fs: Arc::new(RealFileSystem),
            settings: WatchSettings::default(),
            reporter: Arc::new(StderrReporter),
        }
    }

    pub fn with_settings(mut self, settings: WatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn RestartReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

/// Entry point used by the interpreter: parse `words`, then supervise the
/// trailing command through `handler`.
pub async fn run_watch(
    cancel: CancellationToken,
    words: &[String],
    handler: Arc<dyn ExecHandler>,
    env: &WatchEnv,
) -> Result<()> {
    let args = RunWatchArgs::parse_words(words)?;
    supervise(cancel, &args, handler, env).await
}

/// Supervise the already-parsed `args.command` through `handler`.
pub async fn supervise(
    cancel: CancellationToken,
    args: &RunWatchArgs,
    handler: Arc<dyn ExecHandler>,
    env: &WatchEnv,
) -> Result<()> {
    args.validate()?;
    let argv = args.command.clone();
    let action = action(move |token: CancellationToken| {
        let handler = Arc::clone(&handler);
        let argv = argv.clone();
        async move { handler.exec(token, argv).await }
    });
    watch(&args.paths, args.options(), action, env, cancel).await
}

/// Resolve `patterns`, subscribe to their roots and run the control loop
/// until it finishes. Subscriptions are released on every exit path.
pub async fn watch(
    patterns: &[String],
    options: WatchOptions,
    action: Action,
    env: &WatchEnv,
    cancel: CancellationToken,
) -> Result<()> {
    if patterns.is_empty() {
        return Err(RunwatchError::Usage(USAGE.to_string()));
    }

    let plan = WatchPlan::resolve(patterns, &env.working_dir, env.fs.as_ref())?;
    let (sink, source) = event_queue(env.settings.event_queue_capacity);
    let notifier = Notifier::subscribe(&plan, sink)?;
    debug!(
        subscriptions = notifier.subscription_count(),
        ?options,
        "watch session started"
    );

    let controller = Controller::new(plan, source, action, options, Arc::clone(&env.reporter))
        .with_shutdown_grace(env.settings.shutdown_grace);
    let result = controller.run(cancel).await;

    drop(notifier);
    debug!("watch subscriptions released");
    result
}
