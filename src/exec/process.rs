// src/exec/process.rs

//! External command runner.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Extra environment variables for a spawned process, on top of the
/// inherited environment.
pub type ProcessEnv = BTreeMap<String, String>;

/// Run a raw script line through the platform shell.
pub async fn run_shell(
    line: &str,
    dir: &Path,
    env: &ProcessEnv,
    cancel: CancellationToken,
) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };
    cmd.current_dir(dir).envs(env);
    run_to_completion(cmd, line, cancel).await
}

/// Run an already-split argv directly, without a shell.
pub async fn run_argv(
    argv: &[String],
    dir: &Path,
    env: &ProcessEnv,
    cancel: CancellationToken,
) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        bail!("empty command");
    };
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir).envs(env);
    run_to_completion(cmd, &argv.join(" "), cancel).await
}

/// Spawn `cmd` with inherited stdio and wait for it.
///
/// If `cancel` fires first the child is killed and the run counts as
/// successful.
async fn run_to_completion(
    mut cmd: Command,
    cmd_line: &str,
    cancel: CancellationToken,
) -> Result<()> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    debug!(cmd = %cmd_line, "spawning process");
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for '{cmd_line}'"))?;

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of '{cmd_line}'"))?;
            let code = status.code().unwrap_or(-1);
            debug!(cmd = %cmd_line, exit_code = code, success = status.success(), "process exited");

            if !status.success() {
                bail!("command '{cmd_line}' exited with code {code}");
            }
        }

        _ = cancel.cancelled() => {
            info!(cmd = %cmd_line, "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(cmd = %cmd_line, error = %e, "failed to kill child process on cancellation");
            }
        }
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn non_zero_exit_is_an_error_naming_the_code() {
        let err = run_shell("exit 3", Path::new("."), &ProcessEnv::new(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with code 3"), "{err}");
    }

    #[tokio::test]
    async fn cancelled_process_is_killed_and_reports_success() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let argv = vec!["sleep".to_string(), "30".to_string()];
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            run_argv(&argv, Path::new("."), &ProcessEnv::new(), cancel),
        )
        .await
        .expect("kill should be prompt");
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn extra_env_reaches_the_child() {
        let env = ProcessEnv::from([("RUNWATCH_FLAG_MODE".to_string(), "fast".to_string())]);
        let dir = Path::new(".");
        run_shell(r#"test "$RUNWATCH_FLAG_MODE" = fast"#, dir, &env, CancellationToken::new())
            .await
            .unwrap();

        let line = r#"test "$RUNWATCH_FLAG_MODE" = slow"#;
        let err = run_shell(line, dir, &env, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with code 1"), "{err}");
    }
}
