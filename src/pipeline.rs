//! Process orchestration: single commands and multi-stage pipelines.
//!
//! A [`Topology`] resolves every stage's standard streams up front (pipes,
//! redirection targets, the null sink). The [`Orchestrator`] then realises it:
//! all stages are spawned into one process group before any of them is awaited,
//! and that group is tracked as the foreground job while the interpreter waits.

use crate::command::{ExitCode, StageInput, StageOutput};
use crate::env::Environment;
use crate::external::{CommandExecutor, exit_code};
use crate::parser::StageSpec;
use crate::redirect::Redirection;
use crate::signal::{DeferredInterrupts, ForegroundJob};
use crate::terminal::TerminalControl;
use log::{debug, warn};
use std::io;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Stdio};
use std::sync::Arc;
use thiserror::Error;

/// Failures while launching or awaiting a job.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("cannot open {}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("cannot launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot wait for process {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Whether the interpreter itself should stop.
    ///
    /// A redirect target that cannot be opened is the user's problem; failing
    /// to create pipes or processes means the system is in trouble.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Redirect { .. })
    }
}

/// One stage with its standard streams resolved.
#[derive(Debug)]
pub struct PlannedStage {
    pub command: String,
    pub stdin: StageInput,
    pub stdout: StageOutput,
    pub stderr: StageOutput,
}

/// Stream wiring for a whole pipeline, built before anything is spawned.
///
/// Stage `i` reads from pipe `i-1` (unless first) and writes to pipe `i`
/// (unless last). Only the last stage gets the redirection target, and with
/// `suppress_output` its stdout goes to the null sink instead.
#[derive(Debug)]
pub struct Topology {
    stages: Vec<PlannedStage>,
}

impl Topology {
    pub fn build(specs: &[StageSpec], suppress_output: bool) -> Result<Self, LaunchError> {
        let Some((last, front)) = specs.split_last() else {
            return Ok(Self { stages: Vec::new() });
        };
        // Open the final destination first so a bad target fails before any
        // pipe exists.
        let (stdout, stderr) = final_streams(last.redirection.as_ref(), suppress_output)?;

        let mut stages = Vec::with_capacity(specs.len());
        let mut stdin = StageInput::Inherit;
        for spec in front {
            let (reader, writer) = io::pipe().map_err(LaunchError::Pipe)?;
            stages.push(PlannedStage {
                command: spec.command.clone(),
                stdin,
                stdout: StageOutput::Pipe(writer),
                stderr: StageOutput::Inherit,
            });
            stdin = StageInput::Pipe(reader);
        }
        stages.push(PlannedStage {
            command: last.command.clone(),
            stdin,
            stdout,
            stderr,
        });
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[PlannedStage] {
        &self.stages
    }
}

fn final_streams(
    redirection: Option<&Redirection>,
    suppress_output: bool,
) -> Result<(StageOutput, StageOutput), LaunchError> {
    let open = |r: &Redirection| {
        r.open()
            .map(StageOutput::File)
            .map_err(|source| LaunchError::Redirect {
                path: r.path.clone(),
                source,
            })
    };
    let (stdout, stderr) = match redirection {
        None => (StageOutput::Inherit, StageOutput::Inherit),
        Some(r) if r.kind.is_stderr() => (StageOutput::Inherit, open(r)?),
        Some(r) => (open(r)?, StageOutput::Inherit),
    };
    if suppress_output {
        Ok((StageOutput::Null, stderr))
    } else {
        Ok((stdout, stderr))
    }
}

/// Launches jobs through the command executor and waits for them.
pub struct Orchestrator {
    executor: CommandExecutor,
    foreground: Arc<ForegroundJob>,
    terminal: Option<TerminalControl>,
}

impl Orchestrator {
    pub fn new(
        executor: CommandExecutor,
        foreground: Arc<ForegroundJob>,
        terminal: Option<TerminalControl>,
    ) -> Self {
        Self {
            executor,
            foreground,
            terminal,
        }
    }

    pub fn foreground(&self) -> &Arc<ForegroundJob> {
        &self.foreground
    }

    /// Run one command and return its exit status.
    pub fn run_single(
        &self,
        stage: &StageSpec,
        env: &Environment,
        suppress_output: bool,
    ) -> Result<ExitCode, LaunchError> {
        self.run_pipeline(std::slice::from_ref(stage), env, suppress_output)
    }

    /// Run every stage concurrently and return the status of the last one.
    pub fn run_pipeline(
        &self,
        stages: &[StageSpec],
        env: &Environment,
        suppress_output: bool,
    ) -> Result<ExitCode, LaunchError> {
        let topology = Topology::build(stages, suppress_output)?;
        self.launch(topology, env)
    }

    fn launch(&self, topology: Topology, env: &Environment) -> Result<ExitCode, LaunchError> {
        let mut children: Vec<Child> = Vec::with_capacity(topology.stages.len());
        let mut pgid: libc::pid_t = 0;
        let deferred = DeferredInterrupts::begin();

        for stage in topology.stages {
            let mut cmd = self.executor.command(&stage.command, env);
            cmd.stdin(Stdio::from(stage.stdin))
                .stdout(Stdio::from(stage.stdout))
                .stderr(Stdio::from(stage.stderr))
                .process_group(pgid);
            let spawned = cmd.spawn();
            // Dropping the command closes the parent's copies of this stage's
            // pipe ends.
            drop(cmd);

            match spawned {
                Ok(child) => {
                    debug!("launched '{}' as pid {}", stage.command, child.id());
                    if pgid == 0 {
                        pgid = child.id() as libc::pid_t;
                        self.foreground.claim(pgid);
                        if let Some(terminal) = &self.terminal {
                            terminal.hand_to(pgid);
                        }
                    }
                    children.push(child);
                }
                Err(source) => {
                    warn!("spawn of '{}' failed: {source}", stage.command);
                    drop(deferred);
                    // Reap whatever already runs before reporting.
                    let _ = self.wait_all(children);
                    return Err(LaunchError::Spawn {
                        command: stage.command,
                        source,
                    });
                }
            }
        }

        // Interrupts that arrived while spawning now reach the claimed job.
        drop(deferred);
        self.wait_all(children)
    }

    /// Wait for every child in launch order, then drop the foreground job.
    fn wait_all(&self, children: Vec<Child>) -> Result<ExitCode, LaunchError> {
        let mut last_status = 0;
        let mut failure = None;
        for mut child in children {
            match child.wait() {
                Ok(status) => {
                    debug!("pid {} finished with {status}", child.id());
                    last_status = exit_code(status);
                }
                Err(source) => {
                    failure.get_or_insert(LaunchError::Wait {
                        pid: child.id(),
                        source,
                    });
                }
            }
        }

        self.foreground.release();
        if let Some(terminal) = &self.terminal {
            terminal.reclaim();
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(last_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ABNORMAL_EXIT;
    use crate::redirect::RedirectKind;
    use std::fs;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            CommandExecutor::default(),
            Arc::new(ForegroundJob::new()),
            None,
        )
    }

    fn stage(command: &str) -> StageSpec {
        StageSpec {
            command: command.to_owned(),
            redirection: None,
        }
    }

    fn redirected(command: &str, kind: RedirectKind, path: PathBuf) -> StageSpec {
        StageSpec {
            command: command.to_owned(),
            redirection: Some(Redirection { kind, path }),
        }
    }

    #[test]
    fn test_topology_wiring() {
        let topology = Topology::build(&[stage("a"), stage("b"), stage("c")], false).unwrap();
        let stages = topology.stages();
        assert_eq!(stages.len(), 3);
        assert!(matches!(stages[0].stdin, StageInput::Inherit));
        assert!(matches!(stages[0].stdout, StageOutput::Pipe(_)));
        assert!(matches!(stages[1].stdin, StageInput::Pipe(_)));
        assert!(matches!(stages[1].stdout, StageOutput::Pipe(_)));
        assert!(matches!(stages[2].stdin, StageInput::Pipe(_)));
        assert!(matches!(stages[2].stdout, StageOutput::Inherit));
    }

    #[test]
    fn test_topology_suppression_wins_over_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let spec = redirected("a", RedirectKind::OverwriteStdout, dir.path().join("o"));
        let topology = Topology::build(&[spec], true).unwrap();
        assert!(matches!(topology.stages()[0].stdout, StageOutput::Null));
    }

    #[test]
    fn test_topology_bad_redirect_target() {
        let spec = redirected(
            "a",
            RedirectKind::OverwriteStdout,
            PathBuf::from("/nonexistent-dir-for-minish/out"),
        );
        let err = Topology::build(&[spec], false).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_single_command_status() {
        let env = Environment::new();
        let orch = orchestrator();
        assert_eq!(orch.run_single(&stage("true"), &env, false).unwrap(), 0);
        assert_eq!(orch.run_single(&stage("exit 7"), &env, false).unwrap(), 7);
        assert_eq!(orch.foreground().current(), 0);
    }

    #[test]
    fn test_signalled_command_reports_sentinel() {
        let env = Environment::new();
        let status = orchestrator()
            .run_single(&stage("kill -KILL $$"), &env, false)
            .unwrap();
        assert_eq!(status, ABNORMAL_EXIT);
    }

    #[test]
    fn test_three_stage_pipeline_delivers_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let env = Environment::new();
        let stages = [
            stage("printf 'b\\na\\nc\\n'"),
            stage("sort"),
            redirected("tr a-z A-Z", RedirectKind::OverwriteStdout, out.clone()),
        ];
        let status = orchestrator().run_pipeline(&stages, &env, false).unwrap();
        assert_eq!(status, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "A\nB\nC\n");
    }

    #[test]
    fn test_pipeline_status_is_last_stage() {
        let env = Environment::new();
        let orch = orchestrator();
        assert_eq!(
            orch.run_pipeline(&[stage("false"), stage("cat")], &env, false)
                .unwrap(),
            0
        );
        assert_eq!(
            orch.run_pipeline(&[stage("true"), stage("exit 4")], &env, false)
                .unwrap(),
            4
        );
    }

    #[test]
    fn test_reader_sees_eof_when_writer_exits() {
        // `wc -l` only finishes once every write end of its input is closed.
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("count");
        let env = Environment::new();
        let stages = [
            stage("echo one"),
            stage("cat"),
            redirected("wc -l", RedirectKind::OverwriteStdout, out.clone()),
        ];
        orchestrator().run_pipeline(&stages, &env, false).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "1");
    }

    #[test]
    fn test_append_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("log");
        let env = Environment::new();
        let orch = orchestrator();
        let append = redirected("echo x", RedirectKind::AppendStdout, out.clone());
        orch.run_single(&append, &env, false).unwrap();
        orch.run_single(&append, &env, false).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "x\nx\n");

        let truncate = redirected("echo y", RedirectKind::OverwriteStdout, out.clone());
        orch.run_single(&truncate, &env, false).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "y\n");
    }

    #[test]
    fn test_stderr_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let err = dir.path().join("err");
        let env = Environment::new();
        let spec = redirected("echo oops >&2", RedirectKind::OverwriteStderr, err.clone());
        orchestrator().run_single(&spec, &env, false).unwrap();
        assert_eq!(fs::read_to_string(&err).unwrap(), "oops\n");
    }

    #[test]
    fn test_spawn_failure_is_fatal() {
        let orch = Orchestrator::new(
            CommandExecutor::new("/nonexistent/interpreter"),
            Arc::new(ForegroundJob::new()),
            None,
        );
        let err = orch
            .run_single(&stage("true"), &Environment::new(), false)
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(err.is_fatal());
        assert_eq!(orch.foreground().current(), 0);
    }
}
