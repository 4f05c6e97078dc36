// src/pipeline/flags.rs

//! Typed pipeline flags.
//!
//! A pipeline declares its flags in the config; `runwatch pipeline NAME --
//! ARGS...` parses `ARGS` against them with a clap command built at runtime.
//! Resolved values reach every step as `RUNWATCH_FLAG_<NAME>` environment
//! variables (name upper-cased, `-` replaced by `_`).

use std::collections::BTreeMap;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::{PipelineFlagConfig, PipelineFlagType};
use crate::errors::{Result, RunwatchError};

const ENV_PREFIX: &str = "RUNWATCH_FLAG_";

/// A resolved flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    String(String),
    StringArray(Vec<String>),
}

impl FlagValue {
    /// The type's zero value, used when a flag has no default.
    fn zero(kind: PipelineFlagType) -> Self {
        match kind {
            PipelineFlagType::Bool => FlagValue::Bool(false),
            PipelineFlagType::Int => FlagValue::Int(0),
            PipelineFlagType::String => FlagValue::String(String::new()),
            PipelineFlagType::StringArray => FlagValue::StringArray(Vec::new()),
        }
    }

    /// The configured default, or the zero value if none (or a mismatched
    /// one) is set.
    fn from_default(kind: PipelineFlagType, default: Option<&toml::Value>) -> Self {
        match (kind, default) {
            (PipelineFlagType::Bool, Some(toml::Value::Boolean(b))) => FlagValue::Bool(*b),
            (PipelineFlagType::Int, Some(toml::Value::Integer(i))) => FlagValue::Int(*i),
            (PipelineFlagType::String, Some(toml::Value::String(s))) => {
                FlagValue::String(s.clone())
            }
            (PipelineFlagType::StringArray, Some(toml::Value::Array(items))) => {
                FlagValue::StringArray(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                )
            }
            _ => FlagValue::zero(kind),
        }
    }

    /// Environment representation; arrays are space-separated.
    pub fn to_env_string(&self) -> String {
        match self {
            FlagValue::Bool(b) => b.to_string(),
            FlagValue::Int(i) => i.to_string(),
            FlagValue::String(s) => s.clone(),
            FlagValue::StringArray(items) => items.join(" "),
        }
    }
}

/// Flag values of one pipeline run, keyed by flag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagValues(BTreeMap<String, FlagValue>);

impl FlagValues {
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(variable, value)` pairs to export to step processes.
    pub fn to_env(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(name, value)| (flag_env_var(name), value.to_env_string()))
            .collect()
    }
}

/// `deploy-env` -> `RUNWATCH_FLAG_DEPLOY_ENV`.
pub fn flag_env_var(name: &str) -> String {
    format!("{ENV_PREFIX}{}", name.to_ascii_uppercase().replace('-', "_"))
}

/// Parse `args` against the flags of `pipeline`.
///
/// Flags not given on the command line take their configured default.
pub fn parse_flags(
    pipeline: &str,
    flags: &[PipelineFlagConfig],
    args: &[String],
) -> Result<FlagValues> {
    let matches = flag_command(pipeline, flags)
        .try_get_matches_from(args)
        .map_err(|e| {
            RunwatchError::Usage(format!(
                "pipeline '{pipeline}': {}",
                e.render().to_string().trim_end()
            ))
        })?;

    let values = flags
        .iter()
        .map(|flag| (flag.name.clone(), read_value(&matches, flag)))
        .collect();
    Ok(FlagValues(values))
}

fn flag_command(pipeline: &str, flags: &[PipelineFlagConfig]) -> Command {
    let mut cmd = Command::new(pipeline.to_string())
        .no_binary_name(true)
        .disable_version_flag(true);

    for flag in flags {
        let mut arg = Arg::new(flag.name.clone())
            .long(flag.name.clone())
            .value_name(flag.kind.as_str().to_uppercase());
        if let Some(short) = flag.short.as_deref().and_then(|s| s.chars().next()) {
            arg = arg.short(short);
        }
        if let Some(description) = &flag.description {
            arg = arg.help(description.clone());
        }

        arg = match flag.kind {
            // `--flag` alone means true; `--flag=false` turns a true default off.
            PipelineFlagType::Bool => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(value_parser!(bool)),
            PipelineFlagType::Int => arg.value_parser(value_parser!(i64)),
            PipelineFlagType::String => arg.value_parser(value_parser!(String)),
            PipelineFlagType::StringArray => arg
                .action(ArgAction::Append)
                .value_parser(value_parser!(String)),
        };
        cmd = cmd.arg(arg);
    }

    cmd
}

fn read_value(matches: &ArgMatches, flag: &PipelineFlagConfig) -> FlagValue {
    let id = flag.name.as_str();
    let given = match flag.kind {
        PipelineFlagType::Bool => matches.get_one::<bool>(id).copied().map(FlagValue::Bool),
        PipelineFlagType::Int => matches.get_one::<i64>(id).copied().map(FlagValue::Int),
        PipelineFlagType::String => {
            matches.get_one::<String>(id).cloned().map(FlagValue::String)
        }
        PipelineFlagType::StringArray => matches
            .get_many::<String>(id)
            .map(|vals| FlagValue::StringArray(vals.cloned().collect())),
    };
    given.unwrap_or_else(|| FlagValue::from_default(flag.kind, flag.default.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(
        name: &str,
        kind: PipelineFlagType,
        default: Option<toml::Value>,
    ) -> PipelineFlagConfig {
        PipelineFlagConfig {
            name: name.to_string(),
            short: None,
            kind,
            default,
            description: None,
        }
    }

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|a| a.to_string()).collect()
    }

    fn deploy_flags() -> Vec<PipelineFlagConfig> {
        let mut namespace = flag(
            "namespace",
            PipelineFlagType::String,
            Some(toml::Value::String("dev".into())),
        );
        namespace.short = Some("n".into());
        vec![
            namespace,
            flag("dry-run", PipelineFlagType::Bool, None),
            flag("replicas", PipelineFlagType::Int, Some(toml::Value::Integer(1))),
            flag("profile", PipelineFlagType::StringArray, None),
        ]
    }

    #[test]
    fn defaults_apply_when_no_args_are_given() {
        let values = parse_flags("deploy", &deploy_flags(), &[]).unwrap();

        assert_eq!(values.get("namespace"), Some(&FlagValue::String("dev".into())));
        assert_eq!(values.get("dry-run"), Some(&FlagValue::Bool(false)));
        assert_eq!(values.get("replicas"), Some(&FlagValue::Int(1)));
        assert_eq!(values.get("profile"), Some(&FlagValue::StringArray(vec![])));
    }

    #[test]
    fn args_override_defaults_with_typed_values() {
        let values = parse_flags(
            "deploy",
            &deploy_flags(),
            &args(&[
                "-n", "prod", "--dry-run", "--replicas", "3", "--profile", "a", "--profile", "b",
            ]),
        )
        .unwrap();

        assert_eq!(values.get("namespace"), Some(&FlagValue::String("prod".into())));
        assert_eq!(values.get("dry-run"), Some(&FlagValue::Bool(true)));
        assert_eq!(values.get("replicas"), Some(&FlagValue::Int(3)));
        assert_eq!(
            values.get("profile"),
            Some(&FlagValue::StringArray(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn bool_flag_can_switch_a_true_default_off() {
        let flags = vec![flag("cache", PipelineFlagType::Bool, Some(toml::Value::Boolean(true)))];

        let on = parse_flags("build", &flags, &[]).unwrap();
        assert_eq!(on.get("cache"), Some(&FlagValue::Bool(true)));
        let off = parse_flags("build", &flags, &args(&["--cache=false"])).unwrap();
        assert_eq!(off.get("cache"), Some(&FlagValue::Bool(false)));
    }

    #[test]
    fn bad_values_and_unknown_flags_are_usage_errors() {
        for case in [args(&["--replicas", "many"]), args(&["--force"])] {
            match parse_flags("deploy", &deploy_flags(), &case) {
                Err(RunwatchError::Usage(msg)) => {
                    assert!(msg.starts_with("pipeline 'deploy'"), "{msg}")
                }
                other => panic!("expected usage error for {case:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn values_export_as_prefixed_env_vars() {
        let values = parse_flags(
            "deploy",
            &deploy_flags(),
            &args(&["--profile", "a", "--profile", "b"]),
        )
        .unwrap();
        let env = values.to_env();

        assert_eq!(env["RUNWATCH_FLAG_NAMESPACE"], "dev");
        assert_eq!(env["RUNWATCH_FLAG_DRY_RUN"], "false");
        assert_eq!(env["RUNWATCH_FLAG_REPLICAS"], "1");
        assert_eq!(env["RUNWATCH_FLAG_PROFILE"], "a b");
    }
}
