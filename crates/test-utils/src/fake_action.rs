use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use runwatch::exec::{action, Action};
use runwatch::watch::RestartReporter;

/// Shared counters for a fake supervised action.
#[derive(Debug, Default)]
pub struct ActionRecorder {
    starts: AtomicUsize,
    stops: AtomicUsize,
    start_times: Mutex<Vec<Instant>>,
}

impl ActionRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Instances that observed their cancellation and exited.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Instances currently between start and stop.
    pub fn alive(&self) -> usize {
        self.starts() - self.stops()
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.start_times.lock().unwrap().clone()
    }

    fn record_start(&self) {
        self.start_times.lock().unwrap().push(Instant::now());
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    /// Long-running action: counts a start, then runs until killed.
    pub fn long_running(self: &Arc<Self>) -> Action {
        let recorder = Arc::clone(self);
        action(move |cancel: CancellationToken| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.record_start();
                cancel.cancelled().await;
                recorder.stops.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    /// Action that fails with `message` after `after` of (tokio) time.
    pub fn failing_after(
        self: &Arc<Self>,
        after: std::time::Duration,
        message: &'static str,
    ) -> Action {
        let recorder = Arc::clone(self);
        action(move |cancel: CancellationToken| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.record_start();
                tokio::select! {
                    _ = cancel.cancelled() => {
                        recorder.stops.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                    _ = tokio::time::sleep(after) => {
                        recorder.stops.fetch_add(1, Ordering::SeqCst);
                        Err(anyhow!(message))
                    }
                }
            }
        })
    }
}

/// Restart reporter that remembers every notice.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    notices: Mutex<Vec<(Instant, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn paths(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.notices.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

impl RestartReporter for RecordingReporter {
    fn restarting(&self, changed_path: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((Instant::now(), changed_path.to_string()));
    }
}
