// src/builtins/mod.rs

//! Pipeline builtins.
//!
//! - [`run_watch`] supervises a command and restarts it when watched files
//!   change.
//! - `run_pipelines` runs other pipelines by name; it lives with the
//!   interpreter in [`crate::pipeline`] since it recurses into it.

pub mod run_watch;

pub use run_watch::{run_watch, supervise, watch, RunWatchArgs, WatchEnv, USAGE};

pub const RUN_WATCH: &str = "run_watch";
pub const RUN_PIPELINES: &str = "run_pipelines";

/// True if `name` is dispatched to a builtin rather than a process.
pub fn is_builtin(name: &str) -> bool {
    matches!(name, RUN_WATCH | RUN_PIPELINES)
}
