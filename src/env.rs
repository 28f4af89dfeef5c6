use regex::{Captures, Regex};
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;
use std::sync::LazyLock;

/// `$` followed by the maximal run of non-whitespace characters.
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\S+)").expect("variable reference pattern is valid"));

/// Shell variables bound by assignment statements and the `read` builtin.
///
/// Bindings are never removed; assigning an existing name overwrites it.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    bindings: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Replace every `$name` in `text` with the bound value.
    ///
    /// The name is everything up to the next whitespace. Unbound references are
    /// left exactly as written, and inserted values are never scanned again.
    pub fn substitute(&self, text: &str) -> String {
        REFERENCE
            .replace_all(text, |caps: &Captures<'_>| match self.get(&caps[1]) {
                Some(value) => value.to_owned(),
                None => caps[0].to_owned(),
            })
            .into_owned()
    }
}

/// Whether `name` can be bound as a variable.
///
/// Names must survive whitespace tokenization and must not be confused with a
/// reference or an assignment, so `$`, `=` and whitespace are rejected.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '$' || c == '=')
}

/// Mutable, user-level view of the interpreter state that commands run in.
///
/// - `vars`: shell variables available for `$name` substitution.
/// - `current_dir`: the working directory for launched commands.
/// - `should_exit`: set by `quit` so the REPL loop stops after the statement.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: Variables,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Start with no variables in the process's current directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: Variables::new(),
            current_dir,
            should_exit: false,
        }
    }

    /// Shell variable first, then the process environment.
    ///
    /// Used by builtins that need values such as `HOME`, not by substitution.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(str::to_owned)
            .or_else(|| stdenv::var(key).ok())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
