//! The `run_watch` builtin against a real directory tree and real notify
//! subscriptions.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use runwatch::builtins::{run_watch, RunWatchArgs, WatchEnv, USAGE};
use runwatch::errors::RunwatchError;
use runwatch::exec::ExecHandler;
use runwatch::watch::{event_queue, Notifier, WatchPlan};
use runwatch::fs::RealFileSystem;
use runwatch_test_utils::{init_tracing, RecordingReporter};

/// Records every argv it is asked to run and then runs until killed.
#[derive(Debug, Default)]
struct RecordingHandler {
    runs: Mutex<Vec<Vec<String>>>,
}

impl RecordingHandler {
    fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().unwrap().clone()
    }
}

impl ExecHandler for RecordingHandler {
    fn exec(
        &self,
        cancel: CancellationToken,
        argv: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.runs.lock().unwrap().push(argv);
            cancel.cancelled().await;
            Ok(())
        })
    }
}

fn words(s: &[&str]) -> Vec<String> {
    s.iter().map(|w| w.to_string()).collect()
}

async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

#[tokio::test]
async fn usage_errors_are_reported_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(RecordingHandler::default());
    let env = WatchEnv::new(dir.path());

    for case in [words(&[]), words(&["--", "make"]), words(&["-p", "src"])] {
        let res = run_watch(CancellationToken::new(), &case, handler.clone(), &env).await;
        match res {
            Err(RunwatchError::Usage(msg)) => assert_eq!(msg, USAGE),
            other => panic!("expected usage error for {case:?}, got {other:?}"),
        }
    }
    assert!(handler.runs().is_empty());
}

#[tokio::test]
async fn missing_watch_root_fails_without_starting_the_command() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(RecordingHandler::default());
    let env = WatchEnv::new(dir.path());

    let res = run_watch(
        CancellationToken::new(),
        &words(&["-p", "does-not-exist/**/*.go", "--", "go", "run", "."]),
        handler.clone(),
        &env,
    )
    .await;

    match res {
        Err(err @ RunwatchError::WatchRoot { .. }) => {
            let msg = err.to_string();
            assert!(msg.contains("does-not-exist"), "{msg}");
            assert!(msg.contains("the directory or file must exist"), "{msg}");
        }
        other => panic!("expected a watch root error, got {other:?}"),
    }
    assert!(handler.runs().is_empty());
}

#[tokio::test]
async fn patterns_sharing_a_root_share_one_subscription() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/bin")).unwrap();

    let patterns = words(&["src/**/*.rs", "./src/*.toml", "src/bin/*.rs"]);
    let plan = WatchPlan::resolve(&patterns, dir.path(), &RealFileSystem).unwrap();
    assert_eq!(plan.roots().len(), 2);

    let (sink, _source) = event_queue(10);
    let notifier = Notifier::subscribe(&plan, sink).unwrap();
    assert_eq!(notifier.subscription_count(), 2);
}

#[tokio::test]
async fn file_change_restarts_the_command() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/main.txt"), "v1").unwrap();

    let handler = Arc::new(RecordingHandler::default());
    let reporter = RecordingReporter::new();
    let env = WatchEnv::new(dir.path()).with_reporter(reporter.clone());
    let cancel = CancellationToken::new();

    let session = {
        let handler = handler.clone();
        let cancel = cancel.clone();
        let args = words(&["-p", "src/*.txt", "--", "serve", "--port", "8080"]);
        tokio::spawn(async move { run_watch(cancel, &args, handler, &env).await })
    };

    assert!(wait_until(Duration::from_secs(5), || handler.runs().len() == 1).await);
    // Give the backend a moment to finish registering before writing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(dir.path().join("src/main.txt"), "v2").unwrap();

    assert!(
        wait_until(Duration::from_secs(10), || handler.runs().len() == 2).await,
        "command was not restarted"
    );
    assert_eq!(reporter.paths().last().map(String::as_str), Some("src/main.txt"));
    assert!(handler.runs().iter().all(|argv| argv == &words(&["serve", "--port", "8080"])));

    cancel.cancel();
    let res = tokio::time::timeout(Duration::from_secs(15), session)
        .await
        .expect("session should stop after cancellation")
        .unwrap();
    assert!(res.is_ok(), "{res:?}");
}

#[tokio::test]
async fn reading_watched_files_does_not_restart_the_command() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    let watched = dir.path().join("src/main.txt");
    std::fs::write(&watched, "v1").unwrap();

    let handler = Arc::new(RecordingHandler::default());
    let reporter = RecordingReporter::new();
    let env = WatchEnv::new(dir.path()).with_reporter(reporter.clone());
    let cancel = CancellationToken::new();

    let session = {
        let handler = handler.clone();
        let cancel = cancel.clone();
        let args = words(&["-p", "src/*.txt", "--", "cat", "src/main.txt"]);
        tokio::spawn(async move { run_watch(cancel, &args, handler, &env).await })
    };

    assert!(wait_until(Duration::from_secs(5), || handler.runs().len() == 1).await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // What a compiler or `cat` does with its sources when it starts.
    for _ in 0..3 {
        assert_eq!(std::fs::read_to_string(&watched).unwrap(), "v1");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(handler.runs().len(), 1);
    assert!(reporter.paths().is_empty(), "{:?}", reporter.paths());

    cancel.cancel();
    let res = tokio::time::timeout(Duration::from_secs(15), session)
        .await
        .expect("session should stop after cancellation")
        .unwrap();
    assert!(res.is_ok(), "{res:?}");
}

#[test]
fn parsed_args_round_trip_through_the_cli_parser() {
    let args = RunWatchArgs::parse_words(&words(&[
        "--skip-initial",
        "-p",
        "web/**/*.tsx",
        "--",
        "npm",
        "start",
    ]))
    .unwrap();
    assert!(args.skip_initial);
    assert_eq!(args.paths, ["web/**/*.tsx"]);
    assert_eq!(args.command, ["npm", "start"]);
}
