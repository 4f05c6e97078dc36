// src/watch/controller.rs

//! The watch-restart control loop.
//!
//! Each iteration races three sources: session cancellation, the next change
//! event and a fresh quiescence timer. Matching events open (or extend) a
//! debounce window; the window only closes into a restart once a full
//! quiescence period passes without any event. After every iteration the
//! fail-fast policy is applied.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, RunwatchError};
use crate::exec::{Action, TaskSupervisor};
use crate::watch::patterns::WatchPlan;
use crate::watch::queue::{ChangeEvent, EventSource};
use crate::watch::reporter::RestartReporter;

/// Silence required after the last event before a restart happens.
pub const QUIESCENCE_WINDOW: Duration = Duration::from_secs(2);

/// Default upper bound on waiting for the last task during shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Per-invocation policy flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Return the action's error as soon as an instance fails.
    pub fail_on_error: bool,
    /// Do not run the action until the first matching change.
    pub skip_initial: bool,
    /// Do not emit the restart notice.
    pub silent: bool,
}

/// Matching changes seen since the task last (re)started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceWindow {
    matches: usize,
    last_path: Option<String>,
}

impl DebounceWindow {
    pub fn record(&mut self, path: &str) {
        self.matches += 1;
        self.last_path = Some(path.to_string());
    }

    pub fn is_open(&self) -> bool {
        self.matches > 0
    }

    pub fn matches(&self) -> usize {
        self.matches
    }

    /// Close the window, returning the last matching path if it was open.
    pub fn close(&mut self) -> Option<String> {
        let last = self.last_path.take();
        self.matches = 0;
        last
    }
}

/// What woke the control loop up.
enum Wake {
    Cancelled,
    Change(ChangeEvent),
    Fault(RunwatchError),
    Quiet,
}

/// Drives one [`TaskSupervisor`] from filesystem changes.
pub struct Controller {
    plan: WatchPlan,
    source: EventSource,
    action: Action,
    options: WatchOptions,
    reporter: Arc<dyn RestartReporter>,
    shutdown_grace: Duration,
    supervisor: TaskSupervisor,
    window: DebounceWindow,
    restarts: usize,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("plan", &self.plan)
            .field("options", &self.options)
            .field("supervisor", &self.supervisor)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        plan: WatchPlan,
        source: EventSource,
        action: Action,
        options: WatchOptions,
        reporter: Arc<dyn RestartReporter>,
    ) -> Self {
        Self {
            plan,
            source,
            action,
            options,
            reporter,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            supervisor: TaskSupervisor::new(),
            window: DebounceWindow::default(),
            restarts: 0,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Run until `cancel` fires (returns `Ok`), a notifier subscription fails,
    /// or, with `fail_on_error`, the action terminates with an error (returns
    /// that error unchanged).
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        if self.options.skip_initial {
            debug!("skip-initial set; waiting for the first change");
            self.supervisor.install_finished();
        } else {
            self.supervisor.start(&self.action, &cancel)?;
        }

        loop {
            let wake = tokio::select! {
                _ = cancel.cancelled() => Wake::Cancelled,
                Some(event) = self.source.events.recv() => Wake::Change(event),
                Some(fault) = self.source.faults.recv() => Wake::Fault(fault),
                _ = sleep(QUIESCENCE_WINDOW) => Wake::Quiet,
            };

            match wake {
                Wake::Cancelled => {
                    self.shutdown().await;
                    return Ok(());
                }
                Wake::Fault(fault) => {
                    self.shutdown().await;
                    return Err(fault);
                }
                Wake::Change(event) => self.on_change(event),
                Wake::Quiet => {
                    if self.window.is_open() && !self.restart(&cancel).await? {
                        return Ok(());
                    }
                }
            }

            if self.options.fail_on_error {
                if let Some(err) = self.supervisor.take_failure() {
                    info!(error = %err, "supervised action failed; stopping watch");
                    return Err(RunwatchError::Action(err));
                }
            }
        }
    }

    fn on_change(&mut self, event: ChangeEvent) {
        if self.plan.matches(&event) {
            let path = self.plan.display_path(&event);
            self.window.record(&path);
            debug!(
                path = %path,
                matches = self.window.matches(),
                "matching change"
            );
        } else {
            debug!(path = %event.path, "ignoring non-matching change");
        }
    }

    /// Kill, await and restart the action. Returns `Ok(false)` if the session
    /// was cancelled while waiting for the old instance.
    async fn restart(&mut self, cancel: &CancellationToken) -> Result<bool> {
        let changed = self.window.close().unwrap_or_default();
        if !self.options.silent {
            self.reporter.restarting(&changed);
        }

        self.supervisor.kill();
        let cancelled = tokio::select! {
            _ = cancel.cancelled() => true,
            _ = self.supervisor.await_death() => false,
        };
        if cancelled {
            self.shutdown().await;
            return Ok(false);
        }

        self.supervisor.start(&self.action, cancel)?;
        self.restarts += 1;
        info!(path = %changed, restarts = self.restarts, "restarted command");
        Ok(true)
    }

    /// Kill the current instance and give it a bounded time to exit.
    async fn shutdown(&mut self) {
        self.supervisor.kill();
        if timeout(self.shutdown_grace, self.supervisor.await_death())
            .await
            .is_err()
        {
            warn!(
                grace = ?self.shutdown_grace,
                "task still possibly alive after shutdown grace period"
            );
        }
        debug!(restarts = self.restarts, "watch session finished");
    }
}
