// src/logging.rs

//! Logging setup for `runwatch` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level`, applied to `runwatch` itself (other crates stay at `warn`)
//! 2. `RUNWATCH_LOG`, any `EnvFilter` directive string such as
//!    `runwatch::watch=debug,info`
//! 3. `info`
//!
//! Logs go to stderr; stdout belongs to the supervised commands.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "RUNWATCH_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(format!("warn,runwatch={}", level_name(level)));
    }
    match env.map(str::trim).filter(|spec| !spec.is_empty()) {
        Some(spec) => EnvFilter::try_new(spec).unwrap_or_else(|err| {
            eprintln!("ignoring invalid {LOG_ENV_VAR}={spec:?}: {err}");
            EnvFilter::new(DEFAULT_DIRECTIVES)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_filter() -> String {
        EnvFilter::new(DEFAULT_DIRECTIVES).to_string()
    }

    #[test]
    fn cli_level_wins_over_the_environment() {
        let filter = build_filter(Some(LogLevel::Debug), Some("trace")).to_string();
        assert!(filter.contains("runwatch=debug"), "{filter}");
    }

    #[test]
    fn env_directives_are_used_verbatim() {
        let filter = build_filter(None, Some("runwatch::watch=trace")).to_string();
        assert!(filter.contains("runwatch::watch=trace"), "{filter}");
    }

    #[test]
    fn blank_or_invalid_env_falls_back_to_info() {
        assert_eq!(build_filter(None, None).to_string(), default_filter());
        assert_eq!(build_filter(None, Some("  ")).to_string(), default_filter());
        assert_eq!(build_filter(None, Some("runwatch=loud")).to_string(), default_filter());
    }
}
