// src/exec/mod.rs

//! Execution layer.
//!
//! - [`supervisor`] owns the lifecycle of the one supervised action instance
//!   of a watch session.
//! - [`process`] runs external commands under a cancellation token, using
//!   `tokio::process::Command`.
//! - [`duration`] parses the short duration strings used in the config.
//!
//! The supervised action itself is an [`Action`]: a callback that, given a
//! cancellation token, runs one instance of the user's command. Actions are
//! usually built from an [`ExecHandler`], the pipeline interpreter's entry
//! point for running an argv.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub mod duration;
pub mod process;
pub mod supervisor;

pub use duration::parse_duration;
pub use supervisor::{TaskState, TaskSupervisor};

/// Future of one action instance.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Callback that starts one instance of the supervised action.
pub type Action = Arc<dyn Fn(CancellationToken) -> ActionFuture + Send + Sync>;

/// Wrap an async closure as an [`Action`].
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |cancel| Box::pin(f(cancel)) as ActionFuture)
}

/// Runs an argv on behalf of a builtin.
///
/// The pipeline interpreter implements this; builtins such as `run_watch`
/// only see this trait, so tests can supply their own.
pub trait ExecHandler: Send + Sync {
    fn exec(
        &self,
        cancel: CancellationToken,
        argv: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
