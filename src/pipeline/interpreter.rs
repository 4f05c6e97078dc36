// src/pipeline/interpreter.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::builtins::{self, RUN_PIPELINES, RUN_WATCH, WatchEnv};
use crate::config::ConfigFile;
use crate::errors::{Result, RunwatchError};
use crate::exec::process::{run_argv, run_shell, ProcessEnv};
use crate::exec::ExecHandler;
use crate::pipeline::flags::{parse_flags, FlagValues};
use crate::pipeline::script::split_words;

type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Runs configured pipelines and dispatches builtins.
///
/// Cheap to clone; builtins that need an [`ExecHandler`] get a clone of the
/// interpreter itself.
#[derive(Debug, Clone)]
pub struct Interpreter {
    config: Arc<ConfigFile>,
    env: WatchEnv,
    /// Flag variables of the entry pipeline; nested pipelines inherit them.
    flag_env: Arc<ProcessEnv>,
}

impl Interpreter {
    pub fn new(config: ConfigFile, env: WatchEnv) -> Self {
        Self {
            config: Arc::new(config),
            env,
            flag_env: Arc::default(),
        }
    }

    /// A copy whose processes see `values` as `RUNWATCH_FLAG_*` variables.
    pub fn with_flags(&self, values: &FlagValues) -> Self {
        Self {
            flag_env: Arc::new(values.to_env()),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Run every step of pipeline `name` in order.
    ///
    /// A failing step ends the pipeline with that step's error unless the
    /// pipeline sets `continue_on_error`.
    pub fn run_pipeline<'a>(&'a self, name: &'a str, cancel: CancellationToken) -> StepFuture<'a> {
        Box::pin(async move {
            let pipeline = self
                .config
                .get_pipeline(name)
                .ok_or_else(|| RunwatchError::PipelineNotFound(name.to_string()))?;
            info!(pipeline = %name, "running pipeline");

            for (index, step) in pipeline.steps().enumerate() {
                if cancel.is_cancelled() {
                    debug!(pipeline = %name, "pipeline cancelled");
                    return Ok(());
                }

                debug!(pipeline = %name, step = index + 1, line = %step, "running step");
                if let Err(err) = self.run_step(step, cancel.clone()).await {
                    if pipeline.continue_on_error {
                        warn!(
                            pipeline = %name,
                            step = index + 1,
                            error = %err,
                            "step failed; continuing"
                        );
                        continue;
                    }
                    error!(pipeline = %name, step = index + 1, error = %err, "step failed");
                    return Err(err);
                }
            }

            info!(pipeline = %name, "pipeline finished");
            Ok(())
        })
    }

    /// Parse `args` against the flags of pipeline `name`, then run it.
    pub async fn run_pipeline_with_args(
        &self,
        name: &str,
        args: &[String],
        cancel: CancellationToken,
    ) -> Result<()> {
        let pipeline = self
            .config
            .get_pipeline(name)
            .ok_or_else(|| RunwatchError::PipelineNotFound(name.to_string()))?;
        let values = parse_flags(name, &pipeline.flags, args)?;
        if !values.is_empty() {
            debug!(pipeline = %name, flags = ?values, "resolved pipeline flags");
        }
        self.with_flags(&values).run_pipeline(name, cancel).await
    }

    /// Run the named pipelines one after another.
    pub async fn run_pipelines(&self, names: &[String], cancel: CancellationToken) -> Result<()> {
        if names.is_empty() {
            return Err(RunwatchError::Usage(
                "usage: run_pipelines PIPELINE...".to_string(),
            ));
        }
        for name in names {
            self.run_pipeline(name, cancel.clone()).await?;
        }
        Ok(())
    }

    async fn run_step(&self, line: &str, cancel: CancellationToken) -> Result<()> {
        let words = split_words(line).map_err(RunwatchError::Usage)?;
        match words.first() {
            Some(first) if builtins::is_builtin(first) => self.dispatch(words, cancel).await,
            _ => Ok(run_shell(line, &self.env.working_dir, &self.flag_env, cancel).await?),
        }
    }

    /// Run an argv: builtins by name, anything else as a process.
    pub async fn dispatch(&self, argv: Vec<String>, cancel: CancellationToken) -> Result<()> {
        let Some((first, rest)) = argv.split_first() else {
            return Err(RunwatchError::Usage("empty command".to_string()));
        };

        match first.as_str() {
            RUN_WATCH => {
                let handler: Arc<dyn ExecHandler> = Arc::new(self.clone());
                builtins::run_watch(cancel, rest, handler, &self.env).await
            }
            RUN_PIPELINES => self.run_pipelines(rest, cancel).await,
            _ => Ok(run_argv(&argv, &self.env.working_dir, &self.flag_env, cancel).await?),
        }
    }
}

impl ExecHandler for Interpreter {
    fn exec(
        &self,
        cancel: CancellationToken,
        argv: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.dispatch(argv, cancel)
                .await
                .map_err(RunwatchError::into_anyhow)
        })
    }
}
