use crate::env::{Variables, is_valid_name};
use crate::lexer::{join_tokens, split_into_tokens, split_pipeline};
use crate::redirect::{Redirection, split_redirection};
use thiserror::Error;

/// Errors that can occur while turning a line into a [`Statement`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'then' not found")]
    MissingThen,
    #[error("condition is empty")]
    EmptyCondition,
    #[error("'else' not found")]
    MissingElse,
    #[error("'fi' not found")]
    MissingFi,
    #[error("then-part is empty")]
    EmptyThen,
    #[error("else-part is empty")]
    EmptyElse,
    #[error("unexpected '{0}' after 'fi'")]
    TrailingTokens(String),
    #[error("'or' needs at least one command")]
    EmptyOr,
    #[error("empty command in pipeline")]
    EmptyStage,
    #[error("redirection is only allowed on the last pipeline stage")]
    RedirectBeforePipe,
    #[error("invalid variable name '{0}'")]
    InvalidName(String),
}

/// Raw command text split into pipeline stages.
///
/// Stages are kept unexpanded: substitution and redirection parsing happen in
/// [`PipelineSpec::resolve`], right before the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    stages: Vec<String>,
}

impl PipelineSpec {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        split_pipeline(text)
            .map(|stages| Self { stages })
            .ok_or(ParseError::EmptyStage)
    }

    /// Substitute variables in each stage and extract its redirection.
    ///
    /// Only the last stage may redirect; a trailing redirection on any other
    /// stage is rejected.
    pub fn resolve(&self, vars: &Variables) -> Result<Vec<StageSpec>, ParseError> {
        let last = self.stages.len() - 1;
        self.stages
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let stage = StageSpec::resolve(raw, vars);
                if i != last && stage.redirection.is_some() {
                    Err(ParseError::RedirectBeforePipe)
                } else {
                    Ok(stage)
                }
            })
            .collect()
    }
}

/// One pipeline stage ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Command text handed to the command executor.
    pub command: String,
    pub redirection: Option<Redirection>,
}

impl StageSpec {
    pub fn resolve(raw: &str, vars: &Variables) -> Self {
        let expanded = vars.substitute(raw);
        let (command, redirection) = split_redirection(&expanded);
        Self {
            command: command.to_owned(),
            redirection,
        }
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Blank line.
    Empty,
    /// `if C then T else E fi`.
    If {
        condition: PipelineSpec,
        then_branch: PipelineSpec,
        else_branch: PipelineSpec,
    },
    /// `or c1 c2 ...`: one command per operand.
    Or(Vec<PipelineSpec>),
    /// `echo $?`.
    EchoStatus,
    /// `echo $NAME`.
    EchoVar(String),
    /// Builtins parsed with `argh`: `quit`, `cd`, `read`.
    Builtin { name: String, args: Vec<String> },
    /// `prompt = text`.
    SetPrompt(String),
    /// `!!`.
    Repeat,
    /// `NAME = value`.
    Assign { name: String, value: String },
    /// Anything else: delegated to the command executor.
    Run(PipelineSpec),
}

/// Parse a line into a [`Statement`].
///
/// Forms are tried in a fixed priority order, on whitespace tokens.
pub fn parse_statement(line: &str) -> Result<Statement, ParseError> {
    let tokens = split_into_tokens(line);
    let Some(&first) = tokens.first() else {
        return Ok(Statement::Empty);
    };

    match (first, tokens.len()) {
        ("if", _) => parse_if(&tokens),
        ("or", 1) => Err(ParseError::EmptyOr),
        ("or", _) => tokens[1..]
            .iter()
            .map(|op| PipelineSpec::parse(op))
            .collect::<Result<Vec<_>, _>>()
            .map(Statement::Or),
        ("quit", _) => Ok(builtin(&tokens)),
        ("echo", 2) if tokens[1] == "$?" => Ok(Statement::EchoStatus),
        ("echo", 2) if tokens[1].len() > 1 && tokens[1].starts_with('$') => {
            Ok(Statement::EchoVar(tokens[1][1..].to_owned()))
        }
        ("cd", _) | ("read", _) => Ok(builtin(&tokens)),
        ("prompt", n) if n >= 3 && tokens[1] == "=" => {
            Ok(Statement::SetPrompt(join_tokens(&tokens[2..])))
        }
        ("!!", _) => Ok(Statement::Repeat),
        (target, 3) if tokens[1] == "=" => {
            // `$name = value` binds `name` just like `name = value`.
            let name = target.strip_prefix('$').unwrap_or(target);
            if is_valid_name(name) {
                Ok(Statement::Assign {
                    name: name.to_owned(),
                    value: tokens[2].to_owned(),
                })
            } else {
                Err(ParseError::InvalidName(target.to_owned()))
            }
        }
        _ => PipelineSpec::parse(line).map(Statement::Run),
    }
}

fn builtin(tokens: &[&str]) -> Statement {
    Statement::Builtin {
        name: tokens[0].to_owned(),
        args: tokens[1..].iter().map(|t| (*t).to_owned()).collect(),
    }
}

/// Parse `if C then T else E fi` from its tokens (starting with `if`).
///
/// Keywords are only recognised as whole tokens: the first `then`, the first
/// `else` after it, and a `fi` that must close the line.
fn parse_if(tokens: &[&str]) -> Result<Statement, ParseError> {
    let find = |keyword: &str, from: usize| {
        tokens[from..]
            .iter()
            .position(|t| *t == keyword)
            .map(|i| i + from)
    };

    let then_at = find("then", 1).ok_or(ParseError::MissingThen)?;
    let condition = &tokens[1..then_at];
    if condition.is_empty() {
        return Err(ParseError::EmptyCondition);
    }
    let else_at = find("else", then_at + 1).ok_or(ParseError::MissingElse)?;
    let fi_at = find("fi", else_at + 1).ok_or(ParseError::MissingFi)?;
    if let Some(extra) = tokens.get(fi_at + 1) {
        return Err(ParseError::TrailingTokens((*extra).to_owned()));
    }

    let then_part = &tokens[then_at + 1..else_at];
    let else_part = &tokens[else_at + 1..fi_at];
    if then_part.is_empty() {
        return Err(ParseError::EmptyThen);
    }
    if else_part.is_empty() {
        return Err(ParseError::EmptyElse);
    }

    Ok(Statement::If {
        condition: PipelineSpec::parse(&join_tokens(condition))?,
        then_branch: PipelineSpec::parse(&join_tokens(then_part))?,
        else_branch: PipelineSpec::parse(&join_tokens(else_part))?,
    })
}
