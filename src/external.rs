use crate::command::{ABNORMAL_EXIT, ExitCode};
use crate::env::Environment;
use log::debug;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Program used to interpret command text when none is configured.
pub const DEFAULT_EXECUTOR: &str = "sh";

/// The external program that actually interprets command text.
///
/// Every stage is launched as `<program> -c <command text>` in the session's
/// working directory with the interpreter's process environment.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: PathBuf,
}

impl CommandExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `name` against `PATH` the way a shell would.
    ///
    /// Returns `None` when the program cannot be found.
    pub fn resolve(name: &str) -> Option<Self> {
        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        find_command_path(&search_paths, Path::new(name)).map(|p| Self::new(p.into_owned()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the process for one command; stdio is wired by the caller.
    pub fn command(&self, text: &str, env: &Environment) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg(text).current_dir(&env.current_dir);
        cmd
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTOR)
    }
}

/// Map a reaped child's status to the status recorded by the session.
///
/// Normal exits keep their code; anything else becomes [`ABNORMAL_EXIT`].
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => code,
        None => terminated_abnormally(status),
    }
}

fn terminated_abnormally(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = status.signal() {
        debug!(
            "child terminated by signal {signal}{}",
            if status.core_dumped() { " (core dumped)" } else { "" }
        );
    }
    ABNORMAL_EXIT
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo`: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    if path.starts_with("./") && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.exists())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
