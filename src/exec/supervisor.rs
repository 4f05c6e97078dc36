// src/exec/supervisor.rs

//! Lifecycle of the single supervised action instance of a watch session.
//!
//! The protocol is strict: `start` only succeeds when no instance is alive,
//! so a restart is always `kill` -> `await_death` -> `start`.

use anyhow::anyhow;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{Result, RunwatchError};
use crate::exec::Action;

/// Observable state of the managed instance.
#[derive(Debug, Default)]
pub enum TaskState {
    /// Nothing has been installed yet.
    #[default]
    NotStarted,
    Running,
    /// Termination was requested; the instance may still be shutting down.
    Killed,
    /// Fully terminated. `Some` holds the failure until it is taken.
    Dead(Option<anyhow::Error>),
}

/// One running instance of the supervised action.
struct ManagedTask {
    cancel: CancellationToken,
    outcome: oneshot::Receiver<anyhow::Result<()>>,
}

/// Owns the lifecycle of at most one running action instance.
#[derive(Default)]
pub struct TaskSupervisor {
    state: TaskState,
    task: Option<ManagedTask>,
    generation: u64,
}

impl std::fmt::Debug for TaskSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSupervisor")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// Number of instances started so far (the no-op instance excluded).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while an instance is running or killed but not yet awaited.
    pub fn is_alive(&self) -> bool {
        matches!(self.state(), TaskState::Running | TaskState::Killed)
    }

    /// Start a new instance of `action` as its own tokio task. Its
    /// cancellation token is a child of `parent`, so session cancellation
    /// reaches it too.
    pub fn start(&mut self, action: &Action, parent: &CancellationToken) -> Result<()> {
        if self.is_alive() {
            return Err(RunwatchError::TaskOverlap);
        }

        let cancel = parent.child_token();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let fut = action(cancel.clone());
        self.generation += 1;
        let generation = self.generation;

        tokio::spawn(async move {
            let result = fut.await;
            debug!(generation, ok = result.is_ok(), "supervised action finished");
            let _ = outcome_tx.send(result);
        });

        info!(generation, "started supervised action");
        self.task = Some(ManagedTask {
            cancel,
            outcome: outcome_rx,
        });
        self.state = TaskState::Running;
        Ok(())
    }

    /// Install an instance that has already terminated successfully, so the
    /// first restart can kill and await it as a no-op.
    pub fn install_finished(&mut self) {
        self.task = None;
        self.state = TaskState::Dead(None);
    }

    /// Request termination without waiting for it.
    pub fn kill(&mut self) {
        if let Some(task) = &self.task {
            if matches!(self.state, TaskState::Running) {
                info!(generation = self.generation, "killing supervised action");
                task.cancel.cancel();
                self.state = TaskState::Killed;
            }
        }
    }

    /// Wait until the current instance has fully terminated. Returns at once
    /// if nothing is alive. Callers race this against their own cancellation.
    pub async fn await_death(&mut self) {
        if !self.is_alive() {
            return;
        }
        if let Some(task) = self.task.as_mut() {
            let result = (&mut task.outcome).await;
            self.record_outcome(result.map_err(|_| ()));
        }
    }

    /// Non-blocking check for an instance that exited on its own.
    pub fn poll_terminated(&mut self) -> bool {
        if !self.is_alive() {
            return matches!(self.state(), TaskState::Dead(_));
        }
        let Some(task) = self.task.as_mut() else {
            return false;
        };
        match task.outcome.try_recv() {
            Ok(result) => {
                self.record_outcome(Ok(result));
                true
            }
            Err(TryRecvError::Closed) => {
                self.record_outcome(Err(()));
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Take the failure of a terminated instance, if it failed.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        if !self.poll_terminated() {
            return None;
        }
        match &mut self.state {
            TaskState::Dead(err) => err.take(),
            _ => None,
        }
    }

    fn record_outcome(&mut self, result: std::result::Result<anyhow::Result<()>, ()>) {
        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            // The sender only disappears without a value if the task panicked.
            Err(()) => Some(anyhow!("supervised action panicked")),
        };
        self.state = TaskState::Dead(failure);
    }
}
