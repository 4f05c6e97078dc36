use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use runwatch::errors::Result;
use runwatch::exec::Action;
use runwatch::fs::mock::MockFileSystem;
use runwatch::watch::{event_queue, ChangeEvent, Controller, EventSink, WatchOptions, WatchPlan};

use crate::fake_action::RecordingReporter;

/// Working directory of the in-memory project tree.
pub const WORK_DIR: &str = "/work";

/// An in-memory project: `cmd/`, `src/`, `docs/` and a `Cargo.toml`.
pub fn project_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    for dir in ["cmd", "src", "docs"] {
        fs.add_dir(Path::new(WORK_DIR).join(dir));
    }
    fs.add_file(Path::new(WORK_DIR).join("Cargo.toml"));
    fs
}

/// Resolve `patterns` against [`project_fs`].
pub fn project_plan(patterns: &[&str]) -> WatchPlan {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
    WatchPlan::resolve(&patterns, Path::new(WORK_DIR), &project_fs())
        .expect("patterns should resolve against the project tree")
}

/// A controller running on its own task, fed by hand instead of by notify.
pub struct WatchHarness {
    pub sink: EventSink,
    pub cancel: CancellationToken,
    pub reporter: Arc<RecordingReporter>,
    handle: JoinHandle<Result<()>>,
}

impl WatchHarness {
    pub fn spawn(patterns: &[&str], action: Action, options: WatchOptions) -> Self {
        Self::spawn_with_grace(patterns, action, options, Duration::from_secs(10))
    }

    pub fn spawn_with_grace(
        patterns: &[&str],
        action: Action,
        options: WatchOptions,
        grace: Duration,
    ) -> Self {
        let plan = project_plan(patterns);
        let (sink, source) = event_queue(100);
        let reporter = RecordingReporter::new();
        let cancel = CancellationToken::new();

        let controller = Controller::new(plan, source, action, options, reporter.clone())
            .with_shutdown_grace(grace);
        let handle = tokio::spawn(controller.run(cancel.clone()));

        Self {
            sink,
            cancel,
            reporter,
            handle,
        }
    }

    /// Report a change at `path`, relative to root number `root`.
    pub fn change(&self, root: usize, path: &str) {
        assert!(
            self.sink.publish(ChangeEvent {
                root,
                path: path.to_string(),
            }),
            "event queue unexpectedly full"
        );
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the controller to return on its own.
    pub async fn join(self) -> Result<()> {
        self.handle.await.expect("controller task panicked")
    }

    /// Cancel the session and wait for the controller to return.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.join().await
    }
}
