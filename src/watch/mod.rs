// src/watch/mod.rs

//! File watching and restart supervision.
//!
//! This module is responsible for:
//! - Resolving glob patterns into deduplicated watch roots (`patterns`).
//! - Subscribing to those roots with `notify` and forwarding root-relative
//!   paths onto one bounded queue (`notifier`, `queue`).
//! - The control loop that debounces matching changes and restarts the
//!   supervised action (`controller`).
//!
//! It does **not** know how the action runs; that is an [`crate::exec::Action`].

pub mod controller;
pub mod notifier;
pub mod path_utils;
pub mod patterns;
pub mod queue;
pub mod reporter;

pub use controller::{Controller, DebounceWindow, WatchOptions, QUIESCENCE_WINDOW};
pub use notifier::Notifier;
pub use patterns::{
    glob_matches, normalize_pattern, split_pattern, RootKind, WatchPlan, WatchRoot,
};
pub use queue::{event_queue, ChangeEvent, EventSink, EventSource};
pub use reporter::{RestartReporter, StderrReporter};
