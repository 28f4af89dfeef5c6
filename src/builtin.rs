use crate::command::{ExitCode, RUNTIME_ERROR};
use crate::env::{Environment, is_valid_name};
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Commands that change the session itself and so cannot run in a child.
///
/// Arguments are parsed with [`argh`]; the command then runs in-process against
/// the session's streams and [`Environment`].
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Word that invokes the builtin.
    fn name() -> &'static str;

    /// Returns the exit status to record; `Err` is reported and recorded as a failure.
    fn execute(
        self,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Streams a builtin runs against.
pub struct BuiltinIo<'a> {
    pub stdin: &'a mut dyn BufRead,
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
}

/// Run the builtin called `name`, or return `None` if there is no such builtin.
///
/// Usage and runtime errors are written to `io.stderr` and reported as a
/// non-zero status; only failures to write that report escape as `Err`.
pub fn run_builtin(
    name: &str,
    args: &[&str],
    io: &mut BuiltinIo<'_>,
    env: &mut Environment,
) -> Option<io::Result<ExitCode>> {
    Some(match name {
        "cd" => run::<Cd>(args, io, env),
        "read" => run::<Read>(args, io, env),
        "quit" => run::<Quit>(args, io, env),
        _ => return None,
    })
}

fn run<T: BuiltinCommand>(
    args: &[&str],
    io: &mut BuiltinIo<'_>,
    env: &mut Environment,
) -> io::Result<ExitCode> {
    let cmd = match T::from_args(&[T::name()], args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            return if status.is_err() {
                writeln!(io.stderr, "{}", output.trim_end())?;
                Ok(RUNTIME_ERROR)
            } else {
                writeln!(io.stdout, "{}", output.trim_end())?;
                Ok(0)
            };
        }
    };
    match cmd.execute(&mut *io.stdin, &mut *io.stdout, env) {
        Ok(code) => Ok(code),
        Err(e) => {
            writeln!(io.stderr, "{e:#}")?;
            Ok(RUNTIME_ERROR)
        }
    }
}

#[derive(FromArgs)]
/// Change the working directory of the shell and of every command launched after.
pub struct Cd {
    #[argh(positional)]
    /// target directory, resolved against the current one; $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.lookup("HOME") {
                Some(home) => PathBuf::from(home),
                None => bail!("cd: no target and HOME not set"),
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: error changing directory to {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: error changing directory to {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Read one line from standard input into a variable.
pub struct Read {
    #[argh(positional)]
    /// variable that receives the line, without its trailing newline.
    pub name: String,
}

impl BuiltinCommand for Read {
    fn name() -> &'static str {
        "read"
    }

    fn execute(
        self,
        stdin: &mut dyn BufRead,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if !is_valid_name(&self.name) {
            bail!("read: invalid variable name '{}'", self.name);
        }
        let mut line = String::new();
        let n = stdin
            .read_line(&mut line)
            .context("read: cannot read standard input")?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        env.vars.set(self.name, line);
        // End of input still binds the (empty) value but reports failure.
        Ok(if n == 0 { 1 } else { 0 })
    }
}

#[derive(FromArgs)]
/// Leave the shell after the current line.
pub struct Quit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Quit {
    fn name() -> &'static str {
        "quit"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}
