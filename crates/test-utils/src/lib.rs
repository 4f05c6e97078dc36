pub mod builders;
pub mod fake_action;
pub mod watch_harness;

use std::sync::Once;
use runwatch::logging::LOG_ENV_VAR;
use tracing_subscriber::{fmt, EnvFilter};

pub use fake_action::{ActionRecorder, RecordingReporter};
pub use watch_harness::{project_fs, project_plan, WatchHarness, WORK_DIR};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests. The filter is read from `RUNWATCH_LOG` like the binary does, and
/// defaults to debug output for the crate so controller decisions are visible.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("warn,runwatch=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 30-second timeout.
///
/// Under a paused tokio clock the timeout is virtual, so it only trips if
/// the code under test really hangs.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(30), f)
        .await
        .expect("Test timed out after 30 seconds")
}
