use crate::builtin::{BuiltinIo, run_builtin};
use crate::command::{ExitCode, RUNTIME_ERROR, SYNTAX_ERROR};
use crate::config::Config;
use crate::editor::{LineEditor, ReadOutcome};
use crate::env::Environment;
use crate::history::HistoryLog;
use crate::parser::{ParseError, PipelineSpec, Statement, parse_statement};
use crate::pipeline::Orchestrator;
use crate::signal::{ForegroundJob, InterruptRelay};
use crate::terminal::{TerminalControl, stdin_is_terminal};
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// An interactive interpreter session.
///
/// The session owns everything that lives for the whole run: the prompt,
/// variables, history, the last exit status and the last executed command.
/// The only state shared outside it is the [`ForegroundJob`] cell, which the
/// interrupt handler reads.
///
/// Example
/// ```
/// use minish::{Config, MemWriter, Session};
/// let out = MemWriter::new();
/// let mut sh = Session::with_streams(
///     &Config::default(),
///     Box::new(std::io::empty()),
///     Box::new(out.clone()),
///     Box::new(std::io::sink()),
/// );
/// sh.execute("greeting = hi").unwrap();
/// sh.execute("echo $greeting").unwrap();
/// assert_eq!(out.contents(), "hi\n");
/// ```
pub struct Session {
    prompt: String,
    env: Environment,
    history: HistoryLog,
    last_status: ExitCode,
    last_command: Option<String>,
    editor: LineEditor,
    orchestrator: Orchestrator,
    input: Box<dyn BufRead>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Session {
    /// Session on the process's own standard streams.
    ///
    /// Installs the interrupt relay, and when standard input is a terminal,
    /// enables line editing and terminal hand-off to launched jobs.
    pub fn interactive(config: &Config) -> Result<Self> {
        let foreground = InterruptRelay::install(Arc::new(ForegroundJob::new()))
            .context("cannot install interrupt handler")?;
        let interactive = stdin_is_terminal();
        let terminal = if interactive {
            TerminalControl::detect()
        } else {
            None
        };
        info!("session started (interactive: {interactive})");
        Ok(Self::build(
            config,
            foreground,
            interactive,
            terminal,
            Box::new(io::stdin().lock()),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        ))
    }

    /// Session reading lines from `input` without line editing or signal
    /// handling. Launched commands still use the process's own streams.
    pub fn with_streams(
        config: &Config,
        input: Box<dyn BufRead>,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
    ) -> Self {
        Self::build(
            config,
            Arc::new(ForegroundJob::new()),
            false,
            None,
            input,
            out,
            err,
        )
    }

    fn build(
        config: &Config,
        foreground: Arc<ForegroundJob>,
        interactive: bool,
        terminal: Option<TerminalControl>,
        input: Box<dyn BufRead>,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
    ) -> Self {
        Self {
            prompt: config.prompt.clone(),
            env: Environment::new(),
            history: HistoryLog::new(),
            last_status: 0,
            last_command: None,
            editor: LineEditor::new(interactive, foreground.clone()),
            orchestrator: Orchestrator::new(config.executor.clone(), foreground, terminal),
            input,
            out,
            err,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Read-parse-dispatch until `quit` or end of input.
    ///
    /// Returns an error only for failures the session cannot recover from,
    /// such as being unable to launch processes at all.
    pub fn run(&mut self) -> Result<()> {
        while !self.env.should_exit {
            let outcome = self
                .editor
                .read_line(
                    &mut *self.input,
                    &mut *self.out,
                    &self.prompt,
                    &mut self.history,
                )
                .context("cannot read input")?;
            match outcome {
                ReadOutcome::Line(line) => {
                    self.history.push(&line);
                    self.execute(&line)?;
                }
                ReadOutcome::Eof => break,
            }
        }
        self.out.flush()?;
        info!("session finished with status {}", self.last_status);
        Ok(())
    }

    /// Interpret one line.
    ///
    /// Parse and runtime errors are reported on the session's error stream and
    /// recorded in the exit status; only fatal launch failures are returned.
    pub fn execute(&mut self, line: &str) -> Result<()> {
        let statement = match parse_statement(line) {
            Ok(statement) => statement,
            Err(e) => return self.syntax_error(e),
        };
        debug!("dispatching {statement:?}");

        match statement {
            Statement::Empty => {}
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let Some(status) = self.run_spec(&condition, true)? else {
                    return Ok(());
                };
                let branch = if status == 0 {
                    &then_branch
                } else {
                    &else_branch
                };
                if let Some(status) = self.run_spec(branch, false)? {
                    self.last_status = status;
                }
            }
            Statement::Or(operands) => {
                let mut status = RUNTIME_ERROR;
                for operand in &operands {
                    if self.run_spec(operand, true)? == Some(0) {
                        status = 0;
                        break;
                    }
                }
                self.last_status = status;
            }
            Statement::EchoStatus => writeln!(self.out, "{}", self.last_status)?,
            Statement::EchoVar(name) => match self.env.vars.get(&name) {
                Some(value) => writeln!(self.out, "{value}")?,
                None => self.runtime_error(format_args!("{name}: variable not found"))?,
            },
            Statement::Builtin { name, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                let mut io = BuiltinIo {
                    stdin: &mut *self.input,
                    stdout: &mut *self.out,
                    stderr: &mut *self.err,
                };
                match run_builtin(&name, &args, &mut io, &mut self.env) {
                    Some(result) => self.last_status = result?,
                    None => self.runtime_error(format_args!("{name}: not a builtin"))?,
                }
            }
            Statement::SetPrompt(prompt) => self.prompt = prompt,
            Statement::Repeat => match self.last_command.clone() {
                Some(command) => match PipelineSpec::parse(&command) {
                    Ok(spec) => self.run_recorded(&spec)?,
                    Err(e) => self.syntax_error(e)?,
                },
                None => self.runtime_error(format_args!("!!: no previous command in history"))?,
            },
            Statement::Assign { name, value } => self.env.vars.set(name, value),
            Statement::Run(spec) => {
                self.last_command = Some(line.trim().to_owned());
                self.run_recorded(&spec)?;
            }
        }
        Ok(())
    }

    /// Run a command line and record its status.
    fn run_recorded(&mut self, spec: &PipelineSpec) -> Result<()> {
        if let Some(status) = self.run_spec(spec, false)? {
            self.last_status = status;
        }
        Ok(())
    }

    /// Expand and launch a command or pipeline.
    ///
    /// `None` means the job never started and the reason was already reported.
    fn run_spec(&mut self, spec: &PipelineSpec, suppress_output: bool) -> Result<Option<ExitCode>> {
        let stages = match spec.resolve(&self.env.vars) {
            Ok(stages) => stages,
            Err(e) => {
                self.syntax_error(e)?;
                return Ok(None);
            }
        };
        // Keep our own output ordered before anything the job prints.
        self.out.flush()?;

        let result = match stages.as_slice() {
            [single] => self
                .orchestrator
                .run_single(single, &self.env, suppress_output),
            _ => self
                .orchestrator
                .run_pipeline(&stages, &self.env, suppress_output),
        };
        match result {
            Ok(status) => Ok(Some(status)),
            Err(e) if !e.is_fatal() => {
                self.runtime_error(format_args!("{e}"))?;
                Ok(None)
            }
            Err(e) => Err(e).context("cannot launch command"),
        }
    }

    fn syntax_error(&mut self, error: ParseError) -> Result<()> {
        writeln!(self.err, "syntax error: {error}")?;
        self.last_status = SYNTAX_ERROR;
        Ok(())
    }

    fn runtime_error(&mut self, message: std::fmt::Arguments<'_>) -> Result<()> {
        writeln!(self.err, "{message}")?;
        self.last_status = RUNTIME_ERROR;
        Ok(())
    }
}
