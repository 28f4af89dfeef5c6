use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Route diagnostics to `file` (appending) or to standard error.
///
/// Nothing is installed for [`LevelFilter::Off`].
pub fn init(level: LevelFilter, file: Option<&Path>) -> Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();

    let installed = match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            WriteLogger::init(level, config, file)
        }
        None => WriteLogger::init(level, config, io::stderr()),
    };
    installed.context("logger already installed")
}
