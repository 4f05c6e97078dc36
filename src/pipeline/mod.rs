// src/pipeline/mod.rs

//! Minimal pipeline interpreter.
//!
//! Steps are split into words only to recognise builtins; every other step is
//! handed to the platform shell. Pipelines may declare typed flags, passed
//! to their steps as environment variables.

pub mod flags;
pub mod interpreter;
pub mod script;

pub use flags::{flag_env_var, parse_flags, FlagValue, FlagValues};
pub use interpreter::Interpreter;
pub use script::split_words;
