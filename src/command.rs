use std::fs::File;
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Status reported for a child that did not exit normally (killed by a signal
/// or dumped core).
///
/// Normal exit codes live in `0..=255`, so this value never collides with one.
pub const ABNORMAL_EXIT: ExitCode = -1;

/// Status recorded for a statement that failed to parse.
pub const SYNTAX_ERROR: ExitCode = 2;

/// Status recorded for a builtin or runtime error reported by the shell itself.
pub const RUNTIME_ERROR: ExitCode = 1;

/// Where a pipeline stage reads its standard input from.
#[derive(Debug)]
pub enum StageInput {
    /// Inherit the interpreter's standard input.
    Inherit,
    /// Read end of the pipe fed by the previous stage.
    Pipe(std::io::PipeReader),
}

/// Where a pipeline stage writes one of its output streams.
#[derive(Debug)]
pub enum StageOutput {
    /// Inherit the interpreter's stream.
    Inherit,
    /// Write end of the pipe feeding the next stage.
    Pipe(std::io::PipeWriter),
    /// An opened redirection target.
    File(File),
    /// Discard everything written.
    Null,
}

impl From<StageInput> for Stdio {
    fn from(input: StageInput) -> Self {
        match input {
            StageInput::Inherit => Stdio::inherit(),
            StageInput::Pipe(reader) => reader.into(),
        }
    }
}

impl From<StageOutput> for Stdio {
    fn from(output: StageOutput) -> Self {
        match output {
            StageOutput::Inherit => Stdio::inherit(),
            StageOutput::Pipe(writer) => writer.into(),
            StageOutput::File(file) => file.into(),
            StageOutput::Null => Stdio::null(),
        }
    }
}
