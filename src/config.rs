use crate::external::{CommandExecutor, DEFAULT_EXECUTOR};
use anyhow::{Result, anyhow};
use argh::FromArgs;
use log::LevelFilter;
use std::path::PathBuf;

/// Prompt shown until the user changes it with `prompt = ...`.
pub const DEFAULT_PROMPT: &str = "hello:";

#[derive(FromArgs, Debug)]
/// A minimal interactive shell with pipelines, redirection and variables.
pub struct Options {
    #[argh(option, default = "String::from(DEFAULT_PROMPT)")]
    /// initial prompt text.
    pub prompt: String,

    #[argh(option, default = "String::from(DEFAULT_EXECUTOR)")]
    /// program that runs each command as `<executor> -c <text>`; looked up on PATH.
    pub executor: String,

    #[argh(option)]
    /// append diagnostics to this file instead of standard error.
    pub log_file: Option<PathBuf>,

    #[argh(option, default = "LevelFilter::Warn")]
    /// diagnostic verbosity: off, error, warn, info, debug or trace.
    pub log_level: LevelFilter,
}

/// Settings a [`Session`](crate::Session) starts from.
#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    pub executor: CommandExecutor,
}

impl Config {
    /// Validate command-line options, resolving the executor once up front.
    pub fn from_options(options: &Options) -> Result<Self> {
        let executor = CommandExecutor::resolve(&options.executor)
            .ok_or_else(|| anyhow!("executor '{}' not found", options.executor))?;
        Ok(Self {
            prompt: options.prompt.clone(),
            executor,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_owned(),
            executor: CommandExecutor::default(),
        }
    }
}
