// src/watch/reporter.rs

use std::io::Write;

use tracing::info;

/// Receives the user-facing notice printed before a restart.
///
/// Production uses [`StderrReporter`]; tests install a recorder.
pub trait RestartReporter: Send + Sync {
    fn restarting(&self, changed_path: &str);
}

/// Writes the restart notice to stderr, next to the supervised command's own
/// output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrReporter;

impl RestartReporter for StderrReporter {
    fn restarting(&self, changed_path: &str) {
        info!(path = %changed_path, "restarting command");
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\n[runwatch] warn: Restarting command because '{changed_path}' has changed...\n\n"
        );
    }
}
